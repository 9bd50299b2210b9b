//! PromQL-specific error types

use std::fmt;

/// Errors that can occur while turning PromQL text into a selector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromQLError {
    /// Error parsing the PromQL query syntax
    ParseError(String),
    /// Valid PromQL that is not a plain vector selector
    UnsupportedFeature(String),
    /// Invalid label matcher
    InvalidMatcher(String),
}

impl std::error::Error for PromQLError {}

impl fmt::Display for PromQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParseError(msg) => write!(f, "PromQL parse error: {msg}"),
            Self::UnsupportedFeature(feature) => {
                write!(f, "Unsupported PromQL feature: {feature}")
            }
            Self::InvalidMatcher(msg) => write!(f, "Invalid label matcher: {msg}"),
        }
    }
}
