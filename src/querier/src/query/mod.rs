use async_trait::async_trait;
use chrono::DateTime;

use crate::remote::{QueryFunction, QueryOutcome};
use error::SelectError;
use promql::types::{Selector, TimeRange, Value};
use series_set::{Annotation, SeriesSet};

pub mod error;
pub mod promql;
pub mod series_set;

/// Range-selection read access, as consumed by a rule-evaluation engine
#[async_trait]
pub trait Querier: Send + Sync {
    async fn select(&self, range: TimeRange, selector: &Selector) -> SeriesSet;
}

/// [`Querier`] on top of a remote instant-query API
///
/// Each selection is answered by a single range-vector query evaluated at
/// `range.max`. Holds no state besides the injected query function, so one
/// instance can serve concurrent selections.
#[derive(Debug, Clone)]
pub struct RemoteQuerier<Q> {
    query_fn: Q,
}

impl<Q: QueryFunction> RemoteQuerier<Q> {
    pub fn new(query_fn: Q) -> Self {
        Self { query_fn }
    }

    pub fn query_fn(&self) -> &Q {
        &self.query_fn
    }

    /// Select all series matching `selector` within `range`
    ///
    /// The returned set is fully materialized. A zero-width range yields an
    /// empty set without contacting the backend.
    pub async fn select(&self, range: TimeRange, selector: &Selector) -> SeriesSet {
        if range.is_empty() {
            return SeriesSet::empty();
        }
        if range.max < range.min {
            return SeriesSet::failed(SelectError::InvalidTimeRange {
                min: range.min,
                max: range.max,
                reason: "max is before min".to_string(),
            });
        }
        let Some(instant) = DateTime::from_timestamp(range.max, 0) else {
            return SeriesSet::failed(SelectError::InvalidTimeRange {
                min: range.min,
                max: range.max,
                reason: "max is not a representable timestamp".to_string(),
            });
        };
        let Some(duration) = range.duration_secs() else {
            return SeriesSet::failed(SelectError::InvalidTimeRange {
                min: range.min,
                max: range.max,
                reason: "range width overflows".to_string(),
            });
        };

        let expr = promql::range_vector_expr(selector, duration);
        log::debug!("Querying {expr} at {instant}");

        let QueryOutcome { result, warnings } = self.query_fn.query(&expr, instant).await;
        let warnings: Vec<Annotation> = warnings.into_iter().map(Annotation::from).collect();

        match result {
            Ok(Value::Matrix(series)) => SeriesSet::new(series, warnings, None),
            Ok(other) => SeriesSet::new(
                Vec::new(),
                warnings,
                Some(SelectError::UnexpectedValueType {
                    actual: other.value_type(),
                }),
            ),
            Err(e) => {
                log::debug!("Query {expr} failed: {e}");
                SeriesSet::new(Vec::new(), warnings, Some(e.into()))
            }
        }
    }
}

#[async_trait]
impl<Q: QueryFunction> Querier for RemoteQuerier<Q> {
    async fn select(&self, range: TimeRange, selector: &Selector) -> SeriesSet {
        RemoteQuerier::select(self, range, selector).await
    }
}
