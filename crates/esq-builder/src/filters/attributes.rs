//! Filters on plain document attributes.

use esq_config::VectorStore;
use esq_query::{NameScope, QueryDoc};
use serde_json::{Value, json};

use crate::{
    BuildError,
    options::{SearchLevel, SearchOptions},
};

use super::{ancestry_filter, filters_scope};

/// States a document can be filtered by.
const SEARCH_STATES: &[&str] = &["opened", "closed", "merged", "locked"];

/// Hit count for related-notes lookups when none is given.
const DEFAULT_RELATED_SIZE: u64 = 100;

/// Keeps documents in the requested state.
///
/// Blank, `all` and unknown states leave the document unchanged.
pub fn by_state(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    let Some(state) = options.state.as_deref() else {
        return Ok(doc);
    };
    if !SEARCH_STATES.contains(&state) {
        return Ok(doc);
    }

    doc.add_filter(json!({
        "match": { "state": { "_name": filters_scope().name(&["state"]), "query": state } }
    }));
    Ok(doc)
}

/// Excludes documents of archived projects outside project-level searches.
pub fn by_archived(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    let level = options.search_level()?;
    if level == SearchLevel::Project || options.include_archived {
        return Ok(doc);
    }

    doc.add_filter(json!({
        "bool": {
            "_name": filters_scope().name(&["non_archived"]),
            "should": [
                { "bool": { "filter": { "term": { "archived": { "value": false } } } } },
                { "bool": { "must_not": { "exists": { "field": "archived" } } } }
            ]
        }
    }));
    Ok(doc)
}

/// Excludes hidden documents unless the user administers everything.
pub fn by_not_hidden(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    if options.user().is_some_and(|u| u.can_admin_all_resources) {
        return Ok(doc);
    }

    doc.add_filter(json!({
        "term": { "hidden": { "_name": filters_scope().name(&["not_hidden"]), "value": false } }
    }));
    Ok(doc)
}

/// Builds a `should` of an include term and an exclude term on `field`.
fn include_exclude(
    field: &str,
    include: Option<Value>,
    exclude: Option<Value>,
    names: (&str, &str),
) -> Option<Value> {
    let scope = filters_scope();
    let mut should = Vec::new();
    if let Some(value) = include {
        should.push(json!({ "term": { field: { "_name": scope.name(&[names.0]), "value": value } } }));
    }
    if let Some(value) = exclude {
        should.push(json!({
            "bool": {
                "must_not": { "term": { field: { "_name": scope.name(&[names.1]), "value": value } } }
            }
        }));
    }
    if should.is_empty() {
        return None;
    }
    Some(json!({ "bool": { "should": should, "minimum_should_match": 1 } }))
}

/// Keeps merge requests from, or not from, a source branch.
pub fn by_source_branch(
    mut doc: QueryDoc,
    options: &SearchOptions,
) -> Result<QueryDoc, BuildError> {
    doc.add_filter(include_exclude(
        "source_branch",
        options.source_branch.as_deref().map(Value::from),
        options.not_source_branch.as_deref().map(Value::from),
        ("source_branch", "not_source_branch"),
    ));
    Ok(doc)
}

/// Keeps merge requests into, or not into, a target branch.
pub fn by_target_branch(
    mut doc: QueryDoc,
    options: &SearchOptions,
) -> Result<QueryDoc, BuildError> {
    doc.add_filter(include_exclude(
        "target_branch",
        options.target_branch.as_deref().map(Value::from),
        options.not_target_branch.as_deref().map(Value::from),
        ("target_branch", "not_target_branch"),
    ));
    Ok(doc)
}

/// Keeps documents by, or not by, an author.
///
/// Usernames are resolved to ids by the caller.
pub fn by_author(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    doc.add_filter(include_exclude(
        "author_id",
        options.author_id.map(Value::from),
        options.not_author_id.map(Value::from),
        ("author", "not_author"),
    ));
    Ok(doc)
}

/// Renders `{bool: {_name, <occur>: {exists: {field}}}}`.
fn exists(scope: &NameScope, name: &str, occur: &str, field: &str) -> Value {
    json!({ "bool": { "_name": scope.name(&[name]), occur: { "exists": { "field": field } } } })
}

/// Renders `{bool: {<occur>: {terms: {_name, field: values}}}}`.
fn terms(scope: &NameScope, name: &str, occur: &str, field: &str, values: &Value) -> Value {
    json!({ "bool": { occur: { "terms": { "_name": scope.name(&[name]), field: values } } } })
}

/// Filters by assignees: all of, none of, any of, unassigned, or assigned.
pub fn by_assignees(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    let scope = filters_scope();

    if !options.assignee_ids.is_empty() {
        let must: Vec<Value> = options
            .assignee_ids
            .iter()
            .map(|id| json!({ "term": { "assignee_id": id } }))
            .collect();
        doc.add_filter(json!({ "bool": { "_name": scope.name(&["assignee_ids"]), "must": must } }));
    }
    if !options.not_assignee_ids.is_empty() {
        doc.add_filter(terms(
            &scope,
            "not_assignee_ids",
            "must_not",
            "assignee_id",
            &json!(options.not_assignee_ids),
        ));
    }
    if !options.or_assignee_ids.is_empty() {
        doc.add_filter(terms(
            &scope,
            "or_assignee_ids",
            "must",
            "assignee_id",
            &json!(options.or_assignee_ids),
        ));
    }
    if options.none_assignees {
        doc.add_filter(exists(&scope, "none_assignees", "must_not", "assignee_id"));
    }
    if options.any_assignees {
        doc.add_filter(exists(&scope, "any_assignees", "must", "assignee_id"));
    }
    Ok(doc)
}

/// Filters work items by type.
pub fn by_work_item_type_ids(
    mut doc: QueryDoc,
    options: &SearchOptions,
) -> Result<QueryDoc, BuildError> {
    let scope = filters_scope();
    if !options.work_item_type_ids.is_empty() {
        doc.add_filter(terms(
            &scope,
            "work_item_type_ids",
            "must",
            "work_item_type_id",
            &json!(options.work_item_type_ids),
        ));
    }
    if !options.not_work_item_type_ids.is_empty() {
        doc.add_filter(terms(
            &scope,
            "not_work_item_type_ids",
            "must_not",
            "work_item_type_id",
            &json!(options.not_work_item_type_ids),
        ));
    }
    Ok(doc)
}

/// Filters by milestone title, or by having any or no milestone.
///
/// Titles and the any/none switches are not meant to be combined.
pub fn by_milestone(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    let scope = filters_scope();
    if !options.milestone_title.is_empty() {
        doc.add_filter(terms(
            &scope,
            "milestone_title",
            "must",
            "milestone_title",
            &json!(options.milestone_title),
        ));
    }
    if !options.not_milestone_title.is_empty() {
        doc.add_filter(terms(
            &scope,
            "not_milestone_title",
            "must_not",
            "milestone_title",
            &json!(options.not_milestone_title),
        ));
    }
    if options.any_milestones {
        doc.add_filter(exists(&scope, "any_milestones", "must", "milestone_title"));
    }
    if options.none_milestones {
        doc.add_filter(exists(&scope, "none_milestones", "must_not", "milestone_title"));
    }
    Ok(doc)
}

/// Keeps documents of the configured type.
pub fn by_type(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    let doc_type = options.doc_type("by_type filter")?;
    doc.add_filter(json!({
        "term": {
            "type": { "_name": filters_scope().name(&["doc", "is_a", doc_type]), "value": doc_type }
        }
    }));
    Ok(doc)
}

/// Keeps documents below predetermined ancestry paths.
///
/// No visibility checks are applied; only use with scopes that need none.
pub fn by_traversal_ids(
    mut doc: QueryDoc,
    options: &SearchOptions,
) -> Result<QueryDoc, BuildError> {
    doc.add_filter(namespace_ancestry_filter(&options.traversal_ids, options));
    Ok(doc)
}

/// Matches documents below any of `traversal_ids`, or `None` when there are none.
pub(super) fn namespace_ancestry_filter<S: AsRef<str>>(
    traversal_ids: &[S],
    options: &SearchOptions,
) -> Option<Value> {
    if traversal_ids.is_empty() {
        return None;
    }
    let scope = filters_scope().scope(&["namespace"]);
    Some(json!({
        "bool": {
            "should": ancestry_filter(traversal_ids, options.traversal_ids_field(), &scope),
            "minimum_should_match": 1
        }
    }))
}

/// Turns the search into a related-notes lookup for one noteable type.
pub fn by_noteable_type(
    mut doc: QueryDoc,
    options: &SearchOptions,
) -> Result<QueryDoc, BuildError> {
    let Some(noteable_type) = options.noteable_type.as_deref() else {
        return Ok(doc);
    };

    doc.source = Some(vec!["noteable_id".to_string()]);
    doc.size = Some(options.related_size.unwrap_or(DEFAULT_RELATED_SIZE));
    doc.add_filter(json!({
        "term": {
            "noteable_type": {
                "_name": filters_scope().name(&["related", &noteable_type.to_lowercase()]),
                "value": noteable_type
            }
        }
    }));
    Ok(doc)
}

/// Applies the accumulated filters to the Elasticsearch `knn` section.
///
/// Nearest-neighbour hits are otherwise not restricted by `query.bool.filter`.
pub fn by_knn(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    if options.embeddings.is_none() || options.vectors_supported != VectorStore::Elasticsearch {
        return Ok(doc);
    }
    let filters = Value::Array(doc.filters().to_vec());
    if let Some(Value::Object(knn)) = doc.knn.as_mut() {
        knn.insert("filter".into(), filters);
    }
    Ok(doc)
}
