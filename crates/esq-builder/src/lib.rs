//! Search request builders for GitLab documents.
//!
//! Turns a raw query string plus caller-supplied [`SearchOptions`] (current user, search level,
//! scoped projects and groups, attribute filters) into an Elasticsearch/OpenSearch request body.
//!
//! - [`builders`]: one [`QueryBuilder`] per [`DocumentType`]
//! - [`queries`]: text-matching leaves (IID lookup, keyword, hybrid kNN)
//! - [`filters`]: authorization and attribute filters appended to the request
//! - [`pipeline`]: the ordered stages a builder runs
//! - [`relation`]: lazy execution against a [`SearchClient`] with keyset pagination
//!
//! # Example
//!
//! ```
//! use esq_builder::{BuildEnv, DocumentType, SearchOptions};
//! use esq_config::Config;
//! use serde_json::json;
//!
//! let config = Config::default();
//! let env = BuildEnv::new(&config);
//! let options = SearchOptions::from_json(json!({ "search_level": "global" })).unwrap();
//! let doc = DocumentType::Issue.builder().build("login bug", options, &env).unwrap();
//! assert_eq!(doc.to_json()["size"], json!(20));
//! ```

#![warn(missing_docs)]

pub mod aggregations;
pub mod builders;
mod embeddings;
mod env;
mod error;
pub mod filters;
pub mod formats;
pub mod hybrid;
pub mod levels;
pub mod options;
pub mod pagination;
pub mod pipeline;
pub mod queries;
pub mod relation;
pub mod response;
pub mod sorts;
pub mod user;

pub use builders::{DocumentType, Explanation, QueryBuilder};
pub use embeddings::{EmbeddingService, RateLimiter, StaticEmbedding};
pub use env::BuildEnv;
pub use error::{BuildError, ClientError, EmbeddingError};
pub use hybrid::SearchMode;
pub use options::{SearchLevel, SearchOptions};
pub use pagination::{Cursor, Pagination};
pub use pipeline::StageTrace;
pub use relation::{Relation, SearchClient};
pub use response::{ResponseMapper, SearchResults};
pub use user::CurrentUser;
