//! Minimal stand-in for the Prometheus instant-query API

use axum::{Json, Router, extract::Query, http::StatusCode, routing::get};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use url::Url;

/// One received `/api/v1/query` request
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedQuery {
    pub query: String,
    pub time: String,
}

/// Serves a fixed response and records every query it receives
#[derive(Clone)]
pub struct FakePrometheus {
    status: StatusCode,
    body: Value,
    received: Arc<Mutex<Vec<ReceivedQuery>>>,
}

impl FakePrometheus {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn received(&self) -> Vec<ReceivedQuery> {
        self.received.lock().expect("poisoned").clone()
    }

    /// Start serving below `prefix` (e.g. `/prometheus`) and return the base URL
    pub async fn spawn(&self, prefix: &str) -> Url {
        let fake = self.clone();
        let app = Router::new().route(
            &format!("{prefix}/api/v1/query"),
            get(move |Query(params): Query<HashMap<String, String>>| async move {
                fake.received.lock().expect("poisoned").push(ReceivedQuery {
                    query: params.get("query").cloned().unwrap_or_default(),
                    time: params.get("time").cloned().unwrap_or_default(),
                });
                (fake.status, Json(fake.body.clone()))
            }),
        );

        let addr = crate::spawn_http(app).await;
        Url::parse(&format!("http://{addr}{prefix}")).expect("valid base URL")
    }
}
