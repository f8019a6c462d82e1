//! Search mode selection and query embeddings.
//!
//! Whether a search runs as an exact IID lookup, a keyword search or a hybrid keyword + vector
//! search is decided once per build by [`SearchMode`] and threaded through every stage.

use esq_config::{Config, VectorStore};
use esq_query::text;
use tracing::debug;

use crate::{BuildEnv, EmbeddingError, options::SearchOptions};

/// Search origin for which hybrid search is never used.
const GLQL_SOURCE: &str = "glql";

/// How the text part of a search is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Exact lookup of an IID reference such as `#42`.
    Iid(u64),
    /// Keyword search.
    FullText,
    /// Keyword search combined with nearest-neighbour vector search.
    Hybrid,
}

impl SearchMode {
    /// Returns [`SearchMode::Iid`] for IID references and [`SearchMode::FullText`] otherwise.
    pub fn detect(query: &str) -> Self {
        match text::iid(query) {
            Some(iid) => Self::Iid(iid),
            None => Self::FullText,
        }
    }

    /// Like [`SearchMode::detect`], upgrading keyword searches to hybrid when eligible.
    pub fn detect_hybrid(query: &str, options: &SearchOptions, config: &Config) -> Self {
        let mode = Self::detect(query);
        if mode == Self::FullText && hybrid_eligible(query, options, config) {
            Self::Hybrid
        } else {
            mode
        }
    }

    /// Returns the mode name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Iid(_) => "iid",
            Self::FullText => "full_text",
            Self::Hybrid => "hybrid",
        }
    }
}

/// Returns the vector store a search can use: the caller's choice, else the configured one.
pub fn vector_store(options: &SearchOptions, config: &Config) -> VectorStore {
    match options.vectors_supported {
        VectorStore::None => config.hybrid.vectors,
        store => store,
    }
}

/// Returns true when a keyword query qualifies for hybrid search.
///
/// Every condition must hold: a long enough query, a project scope, AI features available to
/// the user and the instance, hybrid search switched on, a vector store, and a search that did
/// not originate from GLQL.
pub fn hybrid_eligible(query: &str, options: &SearchOptions, config: &Config) -> bool {
    let hybrid = &config.hybrid;
    let checks = [
        ("query_length", query.trim().chars().count() >= hybrid.min_query_length),
        (
            "project_scope",
            options.project_ids.is_any() || !options.project_ids.ids().is_empty(),
        ),
        (
            "user_ai_available",
            options.user().is_some_and(|u| u.any_group_with_ai_available),
        ),
        ("hybrid_enabled", hybrid.enabled),
        ("ai_global_switch", hybrid.ai_global_switch),
        ("work_item_embedding", hybrid.work_item_embedding),
        ("ai_available", hybrid.ai_available),
        ("source", options.source.as_deref() != Some(GLQL_SOURCE)),
        ("vectors", vector_store(options, config) != VectorStore::None),
    ];

    match checks.iter().find(|(_, passed)| !passed) {
        Some((check, _)) => {
            debug!(check, "hybrid search not eligible");
            false
        }
        None => true,
    }
}

/// Returns the embedding of `query`.
///
/// A pre-computed `embeddings` option wins. Otherwise the environment's embedding service is
/// asked, after the searching user's rate limit allows it.
pub fn query_embedding(
    query: &str,
    options: &SearchOptions,
    env: &BuildEnv<'_>,
) -> Result<Vec<f32>, EmbeddingError> {
    if let Some(embedding) = &options.embeddings {
        return if embedding.is_empty() {
            Err(EmbeddingError::Empty)
        } else {
            Ok(embedding.clone())
        };
    }

    let service = env.embeddings.ok_or(EmbeddingError::Unavailable)?;
    if let Some(limiter) = env.limiter {
        limiter.check(options.user().map_or(0, |u| u.id))?;
    }

    let embedding = service.embed(query, options.embedding_model())?;
    if embedding.is_empty() {
        return Err(EmbeddingError::Empty);
    }
    Ok(embedding)
}
