//! PromQL support for remote range selections
//!
//! The remote backend only answers instant queries. A range selection is
//! therefore rendered as a range-vector expression evaluated at the end of
//! the window:
//!
//! ```text
//! Selector + TimeRange{min, max} → `{matchers}[<max-min>s]` @ max → matrix
//! ```
//!
//! # Modules
//!
//! - [`types`] - selectors, matchers, time ranges and result values
//! - [`parser`] - selector parsing using the promql-parser crate
//! - [`error`] - error types for PromQL parsing

pub mod error;
pub mod parser;
pub mod types;

use types::Selector;

/// Render `selector` as a range vector spanning `duration_secs`
///
/// `{__name__="up"}` with 1000 seconds becomes `{__name__="up"}[1000s]`.
pub fn range_vector_expr(selector: &Selector, duration_secs: i64) -> String {
    format!("{selector}[{duration_secs}s]")
}
