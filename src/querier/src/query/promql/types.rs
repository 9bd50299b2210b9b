//! PromQL types and conversions
//!
//! This module provides the types a range selection is expressed in
//! (time range, label matchers, selectors) and the result values returned
//! by the remote instant-query API.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::PromQLError;

/// The reserved label carrying the metric name
pub const METRIC_NAME_LABEL: &str = "__name__";

/// A selection window in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub min: i64,
    pub max: i64,
}

impl TimeRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// A zero-width range selects nothing
    pub fn is_empty(&self) -> bool {
        self.min == self.max
    }

    /// Width of the window in seconds, `None` if it does not fit in an `i64`
    pub fn duration_secs(&self) -> Option<i64> {
        self.max.checked_sub(self.min)
    }
}

/// A single sample point; timestamp in milliseconds since epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub timestamp: i64,
    pub value: f64,
}

impl Point {
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// A single sample (metric + value at a point in time)
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Metric labels (including __name__)
    pub metric: Metric,
    /// The sample value
    pub value: f64,
    /// Timestamp in milliseconds since epoch
    pub timestamp: i64,
}

/// A time series (metric + multiple values over time)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Series {
    /// Metric labels (including __name__)
    pub metric: Metric,
    /// Points in chronological order
    pub points: Vec<Point>,
}

impl Series {
    pub fn new(metric: Metric, points: Vec<Point>) -> Self {
        Self { metric, points }
    }

    pub fn labels(&self) -> &Metric {
        &self.metric
    }

    /// Points of this series; can be iterated any number of times
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }
}

/// Metric labels (the label set identifying a time series)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metric {
    /// Label name-value pairs
    pub labels: BTreeMap<String, String>,
}

impl Metric {
    /// Create a new metric with the given name
    pub fn new(name: &str) -> Self {
        let mut labels = BTreeMap::new();
        labels.insert(METRIC_NAME_LABEL.to_string(), name.to_string());
        Self { labels }
    }

    /// Add a label to this metric
    pub fn with_label(mut self, name: &str, value: &str) -> Self {
        self.labels.insert(name.to_string(), value.to_string());
        self
    }

    /// Get the metric name (__name__ label)
    pub fn name(&self) -> Option<&str> {
        self.get(METRIC_NAME_LABEL)
    }

    /// Get a label value by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.labels.get(name).map(|s| s.as_str())
    }
}

impl From<BTreeMap<String, String>> for Metric {
    fn from(labels: BTreeMap<String, String>) -> Self {
        Self { labels }
    }
}

/// Kind of a query result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Vector,
    Matrix,
    Scalar,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vector => write!(f, "vector"),
            Self::Matrix => write!(f, "matrix"),
            Self::Scalar => write!(f, "scalar"),
            Self::String => write!(f, "string"),
        }
    }
}

/// A tagged query result
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Vector(Vec<Sample>),
    Matrix(Vec<Series>),
    Scalar(Point),
    String { timestamp: i64, value: String },
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::Vector(_) => ValueType::Vector,
            Self::Matrix(_) => ValueType::Matrix,
            Self::Scalar(_) => ValueType::Scalar,
            Self::String { .. } => ValueType::String,
        }
    }
}

/// Label matcher types matching Prometheus semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherOp {
    /// Exact string match (=)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Regex match (=~)
    RegexMatch,
    /// Regex not match (!~)
    RegexNotMatch,
}

impl fmt::Display for MatcherOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "="),
            Self::NotEqual => write!(f, "!="),
            Self::RegexMatch => write!(f, "=~"),
            Self::RegexNotMatch => write!(f, "!~"),
        }
    }
}

/// A single label matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMatcher {
    /// Label name
    pub name: String,
    /// Match operation
    pub op: MatcherOp,
    /// Value to match against
    pub value: String,
}

impl LabelMatcher {
    pub fn new(name: &str, op: MatcherOp, value: &str) -> Self {
        Self {
            name: name.to_string(),
            op,
            value: value.to_string(),
        }
    }

    /// Create a new equality matcher
    pub fn equal(name: &str, value: &str) -> Self {
        Self::new(name, MatcherOp::Equal, value)
    }

    /// Create a new not-equal matcher
    pub fn not_equal(name: &str, value: &str) -> Self {
        Self::new(name, MatcherOp::NotEqual, value)
    }

    /// Create a new regex matcher
    pub fn regex_match(name: &str, pattern: &str) -> Self {
        Self::new(name, MatcherOp::RegexMatch, pattern)
    }

    /// Create a new regex not-match matcher
    pub fn regex_not_match(name: &str, pattern: &str) -> Self {
        Self::new(name, MatcherOp::RegexNotMatch, pattern)
    }
}

/// Renders `name="value"`; names outside the legacy charset are quoted
impl fmt::Display for LabelMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if is_legacy_label_name(&self.name) {
            f.write_str(&self.name)?;
        } else {
            write_quoted(f, &self.name)?;
        }
        write!(f, "{}", self.op)?;
        write_quoted(f, &self.value)
    }
}

/// An ordered set of label matchers
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selector {
    pub matchers: Vec<LabelMatcher>,
}

impl Selector {
    pub fn new(matchers: Vec<LabelMatcher>) -> Self {
        Self { matchers }
    }

    /// Selector with a single `__name__` equality matcher
    pub fn metric(name: &str) -> Self {
        Self::new(vec![LabelMatcher::equal(METRIC_NAME_LABEL, name)])
    }

    pub fn with_matcher(mut self, matcher: LabelMatcher) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Value of the first `__name__` equality matcher
    pub fn metric_name(&self) -> Option<&str> {
        self.matchers
            .iter()
            .find(|m| m.name == METRIC_NAME_LABEL && m.op == MatcherOp::Equal)
            .map(|m| m.value.as_str())
    }
}

/// Renders the braces form, e.g. `{__name__="up",job=~"api.*"}`
impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, matcher) in self.matchers.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{matcher}")?;
        }
        f.write_str("}")
    }
}

impl FromStr for Selector {
    type Err = PromQLError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        super::parser::parse_selector(s)
    }
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`
pub fn is_legacy_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '"' => f.write_str("\\\"")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() && (c as u32) < 0x80 => write!(f, "\\x{:02x}", c as u32)?,
            c if c.is_control() => write!(f, "\\u{:04x}", c as u32)?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}
