//! Label filters.

use esq_query::QueryDoc;
use serde_json::{Value, json};

use crate::{BuildError, options::SearchOptions};

use super::filters_scope;

/// Suffix marking a scoped-label wildcard such as `workflow::*`.
const SCOPED_WILDCARD: &str = "::*";

/// Filters by label ids resolved from `label_name`.
///
/// Every resolved name must match; names without ids are ignored. Counting and aggregation
/// requests skip the filter so label facets are computed over the unfiltered result set.
///
/// Superseded by [`by_label_names`] for documents that index label names.
pub fn by_label_ids(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    if options.count_only || options.aggregation || options.label_name.is_empty() {
        return Ok(doc);
    }

    let name = filters_scope().name(&["label_ids"]);
    let must: Vec<Value> = options
        .label_name
        .iter()
        .filter_map(|label| options.label_ids_by_name.get(label))
        .filter(|ids| !ids.is_empty())
        .map(|ids| json!({ "terms": { "_name": name, "label_ids": ids } }))
        .collect();
    if must.is_empty() {
        return Ok(doc);
    }
    doc.add_filter(json!({ "bool": { "must": must } }));
    Ok(doc)
}

/// Filters by label names.
///
/// The five modes combine: all of `label_names`, none of `not_label_names`, any of
/// `or_label_names`, unlabeled, and labeled.
pub fn by_label_names(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    let scope = filters_scope();

    if !options.label_names.is_empty() {
        doc.add_filter(json!({
            "bool": { "_name": scope.name(&["label_names"]), "must": label_queries(&options.label_names) }
        }));
    }
    if !options.not_label_names.is_empty() {
        doc.add_filter(json!({
            "bool": {
                "_name": scope.name(&["not_label_names"]),
                "must_not": label_queries(&options.not_label_names)
            }
        }));
    }
    if !options.or_label_names.is_empty() {
        doc.add_filter(json!({
            "bool": {
                "_name": scope.name(&["or_label_names"]),
                "should": label_queries(&options.or_label_names),
                "minimum_should_match": 1
            }
        }));
    }
    if options.none_label_names {
        doc.add_filter(json!({
            "bool": {
                "_name": scope.name(&["none_label_names"]),
                "must_not": { "exists": { "field": "label_names" } }
            }
        }));
    }
    if options.any_label_names {
        doc.add_filter(json!({
            "bool": {
                "_name": scope.name(&["any_label_names"]),
                "must": { "exists": { "field": "label_names" } }
            }
        }));
    }
    Ok(doc)
}

/// Builds one query per label: a prefix for scoped wildcards, an exact term otherwise.
fn label_queries(labels: &[String]) -> Vec<Value> {
    labels
        .iter()
        .map(|label| {
            if label.ends_with(SCOPED_WILDCARD) {
                let prefix = &label[..label.len() - 1];
                json!({ "prefix": { "label_names": prefix } })
            } else {
                json!({ "term": { "label_names": label } })
            }
        })
        .collect()
}
