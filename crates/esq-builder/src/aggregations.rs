//! Bucket aggregation requests.

use esq_config::{Config, MAX_AGGREGATION_SIZE};
use esq_query::QueryDoc;
use serde_json::{Map, json};

/// Name of the label aggregation in requests and responses.
pub const LABELS_AGGREGATION: &str = "labels";

/// Turns the search into a label facet request.
///
/// No hits are returned; only the label id buckets of the matching documents.
pub fn by_label_ids(mut doc: QueryDoc, config: &Config) -> QueryDoc {
    let size = config.search.aggregation_size.min(MAX_AGGREGATION_SIZE);
    let mut aggs = Map::new();
    aggs.insert(
        LABELS_AGGREGATION.to_string(),
        json!({ "terms": { "field": "label_ids", "size": size } }),
    );
    doc.aggs = Some(aggs);
    doc.size = Some(0);
    doc
}
