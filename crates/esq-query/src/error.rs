//! Error types for query value parsing.

use thiserror::Error;

/// Errors produced while parsing query DSL values from strings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A sort direction other than `asc` or `desc`.
    #[error("invalid sort order '{0}', expected 'asc' or 'desc'")]
    InvalidSortOrder(String),

    /// An unknown bool occurrence name.
    #[error("unknown bool occurrence '{0}'")]
    UnknownOccur(String),
}
