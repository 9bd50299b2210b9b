use crate::query::promql::types::ValueType;
use crate::remote::QueryError;

/// Why a range selection produced no series
#[derive(Debug, thiserror::Error)]
pub enum SelectError {
    /// The query function failed; surfaced verbatim
    #[error(transparent)]
    Query(#[from] QueryError),
    /// The backend answered with something other than a matrix
    #[error("error querying Prometheus, expected type matrix response. actual type {actual}")]
    UnexpectedValueType { actual: ValueType },
    #[error("invalid time range [{min}, {max}]: {reason}")]
    InvalidTimeRange { min: i64, max: i64, reason: String },
}
