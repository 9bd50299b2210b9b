//! The remote instant-query capability the querier is built on

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::query::promql::types::Value;

pub mod prometheus;

pub use prometheus::PrometheusClient;

#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("requesting the query API failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("query API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("{error_type}: {message}")]
    Api {
        status: u16,
        error_type: String,
        message: String,
    },
    #[error("decoding query response failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("query response has no data")]
    MissingData,
    #[error("invalid sample value {0:?}")]
    InvalidSample(String),
}

/// Result of one instant query; warnings may accompany either outcome
#[derive(Debug)]
pub struct QueryOutcome {
    pub result: Result<Value, QueryError>,
    pub warnings: Vec<String>,
}

impl QueryOutcome {
    pub fn ok(value: Value) -> Self {
        Self {
            result: Ok(value),
            warnings: Vec::new(),
        }
    }

    pub fn err(error: QueryError) -> Self {
        Self {
            result: Err(error),
            warnings: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Evaluates a PromQL expression at a single instant
///
/// Transport concerns (authentication, retries, circuit breaking) belong to
/// implementations; callers issue exactly one call per request. Dropping the
/// returned future cancels the call.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QueryFunction: Send + Sync {
    async fn query(&self, expr: &str, instant: DateTime<Utc>) -> QueryOutcome;
}

#[async_trait]
impl<T: QueryFunction + ?Sized> QueryFunction for Arc<T> {
    async fn query(&self, expr: &str, instant: DateTime<Utc>) -> QueryOutcome {
        (**self).query(expr, instant).await
    }
}
