use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub mod rules;

pub use rules::{Alert, AlertDiscovery, AlertingRule, RecordingRule, Rule, RuleDiscovery, RuleGroup};

/// Error types reported in the `errorType` field of an error envelope
///
/// See <https://prometheus.io/docs/prometheus/latest/querying/api/#format-overview>
pub mod error_type {
    pub const BAD_DATA: &str = "bad_data";
    pub const EXECUTION: &str = "execution";
    pub const TIMEOUT: &str = "timeout";
    pub const INTERNAL: &str = "internal";
    pub const UNAVAILABLE: &str = "unavailable";
    pub const NOT_FOUND: &str = "not_found";
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// The JSON envelope every Prometheus API response is wrapped in
///
/// Example:
/// {
///   "status": "success" | "error",
///   "data": <data>,
///   "errorType": "<string>",
///   "error": "<string>",
///   "warnings": ["<string>"]
/// }
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(rename = "errorType", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub infos: Vec<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: Status::Success,
            data: Some(data),
            error_type: None,
            error: None,
            warnings: Vec::new(),
            infos: Vec::new(),
        }
    }

    pub fn error(error_type: &str, error: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            data: None,
            error_type: Some(error_type.to_string()),
            error: Some(error.into()),
            warnings: Vec::new(),
            infos: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// `data` of GET /api/v1/query
///
/// See <https://prometheus.io/docs/prometheus/latest/querying/api/#expression-query-result-formats>
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "resultType", content = "result", rename_all = "lowercase")]
pub enum QueryData {
    Vector(Vec<InstantSample>),
    Matrix(Vec<RangeSeries>),
    Scalar(SamplePair),
    String(SamplePair),
}

impl QueryData {
    /// The `resultType` name of this payload
    pub fn result_type(&self) -> &'static str {
        match self {
            Self::Vector(_) => "vector",
            Self::Matrix(_) => "matrix",
            Self::Scalar(_) => "scalar",
            Self::String(_) => "string",
        }
    }
}

/// `[<unix_time>, "<value>"]`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SamplePair(pub f64, pub String);

/// One element of a `vector` result
///
/// Native histogram samples carry no `value` and are not modelled.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct InstantSample {
    pub metric: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<SamplePair>,
}

/// One element of a `matrix` result
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RangeSeries {
    pub metric: BTreeMap<String, String>,
    #[serde(default)]
    pub values: Vec<SamplePair>,
}

/// `data` of GET /api/v1/status/buildinfo
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    pub version: String,
    pub revision: String,
    pub branch: String,
    pub build_user: String,
    pub build_date: String,
    pub go_version: String,
}
