//! PromQL parser wrapper
//!
//! Turns selector text such as `up{job="api"}` into a [`Selector`] using the
//! promql-parser crate.

use promql_parser::label::{MatchOp, Matcher};
use promql_parser::parser::{self, Expr};

use super::error::PromQLError;
use super::types::{LabelMatcher, METRIC_NAME_LABEL, MatcherOp, Selector};

/// Parse a plain vector selector into its ordered matchers
///
/// A bare metric name becomes a leading `__name__` equality matcher.
/// Range, offset and `@` modifiers as well as any other expression kind
/// are rejected.
///
/// # Examples
/// ```ignore
/// use querier::query::promql::parser::parse_selector;
///
/// let selector = parse_selector("http_requests_total{job=\"api\"}")?;
/// assert_eq!(selector.to_string(), "{__name__=\"http_requests_total\",job=\"api\"}");
/// ```
pub fn parse_selector(input: &str) -> Result<Selector, PromQLError> {
    let expr = parser::parse(input).map_err(|e| PromQLError::ParseError(format!("{e:?}")))?;

    let vs = match expr {
        Expr::VectorSelector(vs) => vs,
        Expr::MatrixSelector(_) => {
            return Err(PromQLError::UnsupportedFeature(
                "range selector; the range is supplied separately".to_string(),
            ));
        }
        _ => {
            return Err(PromQLError::UnsupportedFeature(format!(
                "expected a vector selector, got {input:?}"
            )));
        }
    };

    if vs.offset.is_some() || vs.at.is_some() {
        return Err(PromQLError::UnsupportedFeature(
            "offset and @ modifiers".to_string(),
        ));
    }
    if !vs.matchers.or_matchers.is_empty() {
        return Err(PromQLError::UnsupportedFeature(
            "'or' label matchers".to_string(),
        ));
    }

    let mut matchers: Vec<LabelMatcher> = vs.matchers.matchers.iter().map(convert_matcher).collect();

    // The parser may or may not mirror the bare name into the matcher list
    if let Some(name) = vs.name.as_deref() {
        let name_matcher = LabelMatcher::equal(METRIC_NAME_LABEL, name);
        matchers.retain(|m| *m != name_matcher);
        matchers.insert(0, name_matcher);
    }

    if matchers.is_empty() {
        return Err(PromQLError::InvalidMatcher(
            "selector has no matchers".to_string(),
        ));
    }

    Ok(Selector::new(matchers))
}

fn convert_matcher(matcher: &Matcher) -> LabelMatcher {
    let op = match &matcher.op {
        MatchOp::Equal => MatcherOp::Equal,
        MatchOp::NotEqual => MatcherOp::NotEqual,
        MatchOp::Re(_) => MatcherOp::RegexMatch,
        MatchOp::NotRe(_) => MatcherOp::RegexNotMatch,
    };

    LabelMatcher {
        name: matcher.name.clone(),
        op,
        value: matcher.value.clone(),
    }
}
