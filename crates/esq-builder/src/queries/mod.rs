//! Leaf query fragments.
//!
//! Each function returns a fresh [`QueryDoc`] holding the text-matching part of a search: an
//! exact IID lookup, a keyword query, or a keyword query combined with a nearest-neighbour
//! vector search. Filters are layered on top by the builders.

mod full_text;
mod knn;

use esq_query::{BoolExpr, NameScope, Occur, QueryDoc};
use serde_json::{Value, json};

pub use self::{
    full_text::{by_full_text, by_multi_match_query, by_simple_query_string},
    knn::by_knn,
};

/// Exact match on an IID reference such as `#42` or `!42`.
pub fn by_iid(iid: u64, doc_type: &str) -> QueryDoc {
    let scope = NameScope::root().scope(&[doc_type]);
    let mut query = BoolExpr::new();
    query.add(
        Occur::Filter,
        json!({ "term": { "iid": { "_name": scope.name(&["related", "iid"]), "value": iid } } }),
    );
    query.add(Occur::Filter, type_filter(doc_type));
    QueryDoc::with_query(query)
}

/// Restricts hits to documents of `doc_type`.
pub(crate) fn type_filter(doc_type: &str) -> Value {
    json!({
        "term": {
            "type": {
                "_name": NameScope::root().name(&["doc", "is_a", doc_type]),
                "value": doc_type
            }
        }
    })
}
