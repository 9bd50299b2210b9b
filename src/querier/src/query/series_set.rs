use std::fmt;

use crate::query::error::SelectError;
use crate::query::promql::types::Series;

/// A non-fatal diagnostic attached to a result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation(String);

impl Annotation {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for Annotation {}

impl From<String> for Annotation {
    fn from(message: String) -> Self {
        Self(message)
    }
}

/// Fully fetched result of one range selection
///
/// Iterating yields each [`Series`] once, in the order the backend returned
/// them. The set is not restartable; select again to re-read. Check
/// [`SeriesSet::err`] after (or instead of) draining the iterator: an error
/// and a possibly empty series list are not mutually exclusive, and neither
/// are warnings and series.
#[derive(Debug, Default)]
pub struct SeriesSet {
    series: std::vec::IntoIter<Series>,
    warnings: Vec<Annotation>,
    err: Option<SelectError>,
}

impl SeriesSet {
    pub fn new(series: Vec<Series>, warnings: Vec<Annotation>, err: Option<SelectError>) -> Self {
        Self {
            series: series.into_iter(),
            warnings,
            err,
        }
    }

    /// No series, no warnings, no error
    pub fn empty() -> Self {
        Self::default()
    }

    /// No series, only an error
    pub fn failed(err: SelectError) -> Self {
        Self::new(Vec::new(), Vec::new(), Some(err))
    }

    pub fn err(&self) -> Option<&SelectError> {
        self.err.as_ref()
    }

    pub fn warnings(&self) -> &[Annotation] {
        &self.warnings
    }

    /// Series not yet consumed, plus warnings and error
    pub fn into_parts(self) -> (Vec<Series>, Vec<Annotation>, Option<SelectError>) {
        (self.series.collect(), self.warnings, self.err)
    }
}

impl Iterator for SeriesSet {
    type Item = Series;

    fn next(&mut self) -> Option<Self::Item> {
        self.series.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.series.size_hint()
    }
}

impl ExactSizeIterator for SeriesSet {}
