/// Common test utilities and helpers for integration tests
use axum::{Json, Router, extract::RawQuery, http::StatusCode, routing::get};
use frontend::AppState;
use frontend::federation::{BackendEndpoint, RuleProxy};
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

pub mod fake_prometheus;

/// Initialize test logging
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Serve `app` on an ephemeral local port for the rest of the test
pub async fn spawn_http(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Test server error");
    });
    addr
}

/// A local port nothing listens on
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to get local address");
    drop(listener);
    addr
}

pub fn rule_group(name: &str) -> Value {
    json!({
        "name": name,
        "file": "/etc/rules/rules.yaml",
        "rules": [{
            "type": "recording",
            "name": format!("{name}:sum"),
            "query": "sum(up)",
            "health": "ok",
            "evaluationTime": 0.001,
            "lastEvaluation": "2024-01-01T00:00:00Z"
        }],
        "interval": 60,
        "limit": 0,
        "evaluationTime": 0.001,
        "lastEvaluation": "2024-01-01T00:00:00Z"
    })
}

pub fn alert(name: &str) -> Value {
    json!({
        "labels": {"alertname": name},
        "annotations": {"summary": format!("{name} is firing")},
        "state": "firing",
        "activeAt": "2024-01-01T00:00:00Z",
        "value": "1e+00"
    })
}

/// Stand-in for one rule-evaluator instance
#[derive(Clone)]
pub struct FakeRuleEvaluator {
    groups: Vec<Value>,
    alerts: Vec<Value>,
    delay: Duration,
    failure: Option<StatusCode>,
    queries: Arc<Mutex<Vec<Option<String>>>>,
    cancelled: Arc<AtomicUsize>,
}

impl Default for FakeRuleEvaluator {
    fn default() -> Self {
        Self {
            groups: Vec::new(),
            alerts: Vec::new(),
            delay: Duration::ZERO,
            failure: None,
            queries: Arc::new(Mutex::new(Vec::new())),
            cancelled: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FakeRuleEvaluator {
    pub fn with_groups(names: &[&str]) -> Self {
        Self {
            groups: names.iter().map(|n| rule_group(n)).collect(),
            ..Default::default()
        }
    }

    /// Serve `groups` exactly as given
    pub fn with_raw_groups(groups: Vec<Value>) -> Self {
        Self {
            groups,
            ..Default::default()
        }
    }

    pub fn alerts(mut self, names: &[&str]) -> Self {
        self.alerts = names.iter().map(|n| alert(n)).collect();
        self
    }

    /// Answer only after `delay`
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Answer every request with an error envelope and `status`
    pub fn failing(mut self, status: StatusCode) -> Self {
        self.failure = Some(status);
        self
    }

    /// Raw query strings received so far, in arrival order
    pub fn received_queries(&self) -> Vec<Option<String>> {
        self.queries.lock().expect("poisoned").clone()
    }

    /// Requests whose handler was dropped before it answered
    pub fn cancelled_requests(&self) -> usize {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub async fn spawn(&self) -> Url {
        let rules = self.clone();
        let alerts = self.clone();
        let app = Router::new()
            .route(
                "/api/v1/rules",
                get(move |RawQuery(query): RawQuery| async move {
                    rules.respond(query, json!({ "groups": rules.groups })).await
                }),
            )
            .route(
                "/api/v1/alerts",
                get(move |RawQuery(query): RawQuery| async move {
                    alerts.respond(query, json!({ "alerts": alerts.alerts })).await
                }),
            );

        let addr = spawn_http(app).await;
        Url::parse(&format!("http://{addr}")).expect("valid backend URL")
    }

    async fn respond(&self, query: Option<String>, data: Value) -> (StatusCode, Json<Value>) {
        self.queries.lock().expect("poisoned").push(query);
        let mut guard = CancelGuard {
            cancelled: self.cancelled.clone(),
            answered: false,
        };
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        guard.answered = true;
        match self.failure {
            Some(status) => (
                status,
                Json(json!({
                    "status": "error",
                    "errorType": "internal",
                    "error": "rule evaluator unavailable"
                })),
            ),
            None => (
                StatusCode::OK,
                Json(json!({ "status": "success", "data": data })),
            ),
        }
    }
}

struct CancelGuard {
    cancelled: Arc<AtomicUsize>,
    answered: bool,
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        if !self.answered {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Poll `condition` until it holds, panicking after five seconds
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting until {what}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Start a query frontend federating `backends`, returning its base URL
pub async fn spawn_frontend(backends: &[Url], timeout: Duration) -> Url {
    let endpoints = backends
        .iter()
        .cloned()
        .map(BackendEndpoint::new)
        .collect();
    let proxy = RuleProxy::new(endpoints, timeout).expect("Failed to build rule proxy");

    let addr = spawn_http(frontend::create_router(AppState::new(proxy))).await;
    Url::parse(&format!("http://{addr}")).expect("valid frontend URL")
}

/// GET `path` (with optional query) from `base` and decode the JSON body
pub async fn get_json(base: &Url, path_and_query: &str) -> (StatusCode, Value) {
    let url = format!("{}{}", base.as_str().trim_end_matches('/'), path_and_query);
    let response = reqwest::get(url).await.expect("request failed");
    let status = StatusCode::from_u16(response.status().as_u16()).expect("valid status");
    let body = response.json::<Value>().await.expect("JSON body");
    (status, body)
}
