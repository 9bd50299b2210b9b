//! Fan-out of the rules and alerts APIs over several rule-evaluator backends
//!
//! Every inbound request issues one GET per configured backend. The calls run
//! concurrently under a single deadline and their payloads are concatenated in
//! configuration order. Identically named groups or alerts from different
//! backends are all kept.
//!
//! Groups and alerts are passed through as raw JSON, so fields this crate
//! does not model reach the client unchanged.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use prom_api::{ApiResponse, Status};
use serde_json::Value;
use tokio::time::Instant;
use url::Url;

const RULES_PATH: &str = "/api/v1/rules";
const ALERTS_PATH: &str = "/api/v1/alerts";

/// Base URL of one backend serving the Prometheus rules and alerts APIs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendEndpoint {
    base: Url,
}

impl BackendEndpoint {
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn rules_url(&self) -> Url {
        self.join(RULES_PATH)
    }

    pub fn alerts_url(&self) -> Url {
        self.join(ALERTS_PATH)
    }

    fn join(&self, path: &str) -> Url {
        let mut url = self.base.clone();
        let joined = format!("{}{path}", self.base.path().trim_end_matches('/'));
        url.set_path(&joined);
        url.set_query(None);
        url
    }
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

impl From<Url> for BackendEndpoint {
    fn from(base: Url) -> Self {
        Self::new(base)
    }
}

/// Why a single backend contributed nothing to a merged response
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no response within {0:?}")]
    Timeout(Duration),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("decoding response failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{error_type}: {message}")]
    Api { error_type: String, message: String },
    #[error("response has no data")]
    MissingData,
    #[error("data.{0} is not a list")]
    NotAList(&'static str),
}

#[derive(Debug)]
pub struct BackendFailure {
    pub endpoint: BackendEndpoint,
    pub error: BackendError,
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint, self.error)
    }
}

/// Every configured backend failed
#[derive(Debug, thiserror::Error)]
pub struct FederationError {
    pub failures: Vec<BackendFailure>,
}

impl fmt::Display for FederationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all {} backends failed", self.failures.len())?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{failure}")?;
        }
        Ok(())
    }
}

/// Concatenated payloads
///
/// `warnings` carries the backends' own warnings followed by one
/// `<backend url>: <cause>` entry per failed backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged<T> {
    pub items: Vec<T>,
    pub warnings: Vec<String>,
}

/// Federates `/api/v1/rules` and `/api/v1/alerts` over a fixed backend list
#[derive(Debug, Clone)]
pub struct RuleProxy {
    http: reqwest::Client,
    endpoints: Arc<[BackendEndpoint]>,
    timeout: Duration,
}

impl RuleProxy {
    /// `timeout` bounds all backend calls of one inbound request together
    pub fn new(endpoints: Vec<BackendEndpoint>, timeout: Duration) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("promrelay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self::with_client(http, endpoints, timeout))
    }

    pub fn with_client(
        http: reqwest::Client,
        endpoints: Vec<BackendEndpoint>,
        timeout: Duration,
    ) -> Self {
        Self {
            http,
            endpoints: endpoints.into(),
            timeout,
        }
    }

    pub fn endpoints(&self) -> &[BackendEndpoint] {
        &self.endpoints
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Rule groups of all backends; `raw_query` is forwarded verbatim
    pub async fn rule_groups(
        &self,
        raw_query: Option<&str>,
    ) -> Result<Merged<Value>, FederationError> {
        self.fan_out(BackendEndpoint::rules_url, raw_query, "groups").await
    }

    /// Alerts of all backends; `raw_query` is forwarded verbatim
    pub async fn alerts(&self, raw_query: Option<&str>) -> Result<Merged<Value>, FederationError> {
        self.fan_out(BackendEndpoint::alerts_url, raw_query, "alerts").await
    }

    async fn fan_out(
        &self,
        url_of: fn(&BackendEndpoint) -> Url,
        raw_query: Option<&str>,
        key: &'static str,
    ) -> Result<Merged<Value>, FederationError> {
        let deadline = Instant::now() + self.timeout;
        let raw_query = raw_query.filter(|q| !q.is_empty());

        let calls = self.endpoints.iter().map(|endpoint| {
            let mut url = url_of(endpoint);
            url.set_query(raw_query);
            async move {
                let result = match tokio::time::timeout_at(deadline, self.fetch(url, key)).await {
                    Ok(result) => result,
                    Err(_) => Err(BackendError::Timeout(self.timeout)),
                };
                (endpoint, result)
            }
        });
        let results = join_all(calls).await;

        let mut items = Vec::new();
        let mut warnings = Vec::new();
        let mut failures = Vec::new();
        for (endpoint, result) in results {
            match result {
                Ok((backend_items, backend_warnings)) => {
                    items.extend(backend_items);
                    warnings.extend(backend_warnings);
                }
                Err(error) => {
                    log::warn!("Backend {endpoint} failed: {error}");
                    failures.push(BackendFailure {
                        endpoint: endpoint.clone(),
                        error,
                    });
                }
            }
        }

        if !failures.is_empty() && failures.len() == self.endpoints.len() {
            return Err(FederationError { failures });
        }
        warnings.extend(failures.iter().map(ToString::to_string));

        Ok(Merged { items, warnings })
    }

    #[tracing::instrument(skip_all, fields(url = %url))]
    async fn fetch(
        &self,
        url: Url,
        key: &'static str,
    ) -> Result<(Vec<Value>, Vec<String>), BackendError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        let envelope: ApiResponse<Value> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => return Err(BackendError::Status(status.as_u16())),
            Err(e) => return Err(e.into()),
        };

        match envelope.status {
            Status::Error => Err(BackendError::Api {
                error_type: envelope.error_type.unwrap_or_default(),
                message: envelope.error.unwrap_or_default(),
            }),
            Status::Success if !status.is_success() => Err(BackendError::Status(status.as_u16())),
            Status::Success => {
                let data = envelope.data.ok_or(BackendError::MissingData)?;
                Ok((take_list(data, key)?, envelope.warnings))
            }
        }
    }
}

/// The `key` list of a `data` object; absent or `null` is empty
fn take_list(data: Value, key: &'static str) -> Result<Vec<Value>, BackendError> {
    let Value::Object(mut data) = data else {
        return Err(BackendError::MissingData);
    };
    match data.remove(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(BackendError::NotAList(key)),
    }
}
