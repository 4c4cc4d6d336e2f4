//! Query compilation
//!
//! Raw request values flow through the [`ValueParser`] (typed scalars,
//! ranges, negation), spatial values through [`geometry::normalize`], and the
//! [`QueryCompiler`] assembles the per-parameter groups into a [`BoolQuery`]:
//!
//! ```text
//! must:   [full-text clause]             (scores)
//! filter: [COUNTRY group, YEAR group]    (does not score)
//! ```

mod compiler;
pub mod dates;
pub mod full_text;
pub mod geometry;
mod predicate;
mod value;

pub use compiler::QueryCompiler;
pub use full_text::{FullTextField, QueryStringBuilder, SuggestQueryBuilder, WildcardPadding};
pub use predicate::{BoolQuery, FilterPredicate, FullTextClause, QueryNode};
pub use value::{parse_scalar, FilterValue, ParsedValue, TypedValue, ValueParser};
