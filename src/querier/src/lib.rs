//! Translation of range selections into remote instant queries

pub mod query;
pub mod remote;

pub use query::error::SelectError;
pub use query::promql::types::{LabelMatcher, Metric, Point, Selector, Series, TimeRange};
pub use query::series_set::{Annotation, SeriesSet};
pub use query::{Querier, RemoteQuerier};
pub use remote::{PrometheusClient, QueryError, QueryFunction, QueryOutcome};
