//! Hybrid keyword + vector search.

use std::borrow::Cow;

use esq_config::VectorStore;
use esq_query::QueryDoc;
use serde_json::json;
use tracing::warn;

use crate::{
    BuildEnv, BuildError,
    hybrid::{query_embedding, vector_store},
    options::{KeywordMatchClause, SearchOptions},
};

use super::by_full_text;

/// Keyword search combined with a nearest-neighbour search on the query embedding.
///
/// Without a vector store this is plain keyword search. On OpenSearch the keyword clause is
/// down-weighted and moved to `should` so vector hits can outrank it. When no embedding can be
/// obtained the keyword document is returned as is.
pub fn by_knn(
    query: &str,
    options: &SearchOptions,
    env: &BuildEnv<'_>,
) -> Result<QueryDoc, BuildError> {
    let store = vector_store(options, env.config);
    if store == VectorStore::None {
        return by_full_text(query, options, env);
    }

    let keyword_options = if store == VectorStore::Opensearch {
        let mut adjusted = options.clone();
        adjusted.simple_query_string_boost = Some(env.config.hybrid.keyword_boost);
        adjusted.keyword_match_clause = KeywordMatchClause::Should;
        Cow::Owned(adjusted)
    } else {
        Cow::Borrowed(options)
    };
    let mut doc = by_full_text(query, &keyword_options, env)?;

    let embedding = match query_embedding(query, options, env) {
        Ok(embedding) => embedding,
        Err(error) => {
            warn!(%error, "query embedding unavailable, using keyword search");
            return Ok(doc);
        }
    };

    let hybrid = &env.config.hybrid;
    let field = options.embedding_field();
    match store {
        VectorStore::Elasticsearch => {
            doc.knn = Some(json!({
                "field": field,
                "query_vector": embedding,
                "boost": options.hybrid_boost.unwrap_or(hybrid.boost),
                "k": hybrid.k,
                "num_candidates": hybrid.num_candidates,
                "similarity": options.hybrid_similarity.unwrap_or(hybrid.similarity)
            }));
        }
        VectorStore::Opensearch => {
            doc.add_should(json!({ "knn": { field: { "k": hybrid.k, "vector": embedding } } }));
        }
        VectorStore::None => {}
    }

    Ok(doc)
}
