//! Error types for the esq-builder crate.
//!
//! Every variant is a contract violation by the caller: the options handed to a builder were
//! incomplete or inconsistent. Failures of collaborators (embedding service, rate limiter) never
//! surface here; builders degrade to keyword search instead.

use esq_query::QueryError;
use thiserror::Error;

/// Errors that can occur while building a search request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A filter that scopes by search level was used without one.
    #[error("search_level is required")]
    MissingSearchLevel,

    /// The search level is not one of `global`, `group` or `project`.
    #[error("search_level invalid: {0}")]
    InvalidSearchLevel(String),

    /// A group-level search was requested without any group.
    #[error("No group_ids provided for group level search")]
    MissingGroupIds,

    /// A project-level search was requested without any readable project.
    #[error("No project_ids provided for project level search")]
    MissingProjectIds,

    /// A type filter or type-tagged query was requested without a document type.
    #[error("{0} requires doc_type option")]
    MissingDocType(&'static str),

    /// No builder exists for the requested document type.
    #[error("unknown document type: {0}")]
    UnknownDocType(String),

    /// Keyset pagination was requested on a document without a sort clause.
    #[error("cannot paginate a query without a sort clause")]
    MissingSort,

    /// The options document could not be deserialized.
    #[error("invalid search options: {0}")]
    InvalidOptions(String),

    /// A query value type rejected its input.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// Errors raised while obtaining a query embedding.
///
/// These are logged and swallowed by the hybrid search path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmbeddingError {
    /// The per-user embedding budget is exhausted.
    #[error("embedding requests for user {user_id} are rate limited")]
    RateLimited {
        /// User whose budget ran out (`0` for anonymous searches).
        user_id: u64,
    },

    /// No embedding service is available to this build.
    #[error("no embedding service configured")]
    Unavailable,

    /// The service answered without a vector.
    #[error("embedding service returned an empty vector")]
    Empty,

    /// The service failed.
    #[error("embedding service failed: {0}")]
    Service(String),
}

/// Errors raised by a [`SearchClient`](crate::SearchClient).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The request could not be delivered or the cluster rejected it.
    #[error("search request failed: {0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("unexpected search response: {0}")]
    InvalidResponse(String),
}
