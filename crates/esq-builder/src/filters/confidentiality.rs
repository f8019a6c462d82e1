//! Confidentiality filters.
//!
//! Confidential documents are visible to users who read everything, to their author and
//! assignees, and to members with at least reporter access. Everyone else only sees
//! non-confidential documents.

use esq_query::{BoolExpr, NameScope, Occur, QueryDoc};
use serde_json::{Value, json};

use crate::{
    BuildError,
    levels::{access, visibility},
    options::{ProjectScope, SearchOptions},
    user::CurrentUser,
};

use super::{access::traversal_ids_at_level, ancestry_filter, filters_scope};

/// Field holding a document's namespace visibility level.
const NAMESPACE_VISIBILITY_FIELD: &str = "namespace_visibility_level";

/// Restricts the explicit `confidential` option, if any.
fn requested_confidentiality(doc: &mut QueryDoc, options: &SearchOptions) {
    if let Some(confidential) = options.confidential {
        doc.add_filter(json!({
            "term": {
                "confidential": {
                    "_name": filters_scope().name(&["confidential"]),
                    "value": confidential
                }
            }
        }));
    }
}

/// Hides confidential project documents from users who may not read them.
///
/// The filter is skipped when every searched project grants the user reporter access.
pub fn by_confidentiality(mut doc: QueryDoc, options: &SearchOptions) -> Result<QueryDoc, BuildError> {
    requested_confidentiality(&mut doc, options);

    let scope = filters_scope();
    let non_confidential = json!({
        "term": { "confidential": { "_name": scope.name(&["non_confidential"]), "value": false } }
    });

    let user = match options.user() {
        Some(user) if user.can_read_all_resources => return Ok(doc),
        Some(user) => user,
        None => {
            doc.add_filter(non_confidential);
            return Ok(doc);
        }
    };

    let scoped = options.scoped_project_ids();
    let authorized = reporter_project_ids(user, &scoped);
    if let ProjectScope::Ids(ids) = &scoped
        && !ids.is_empty()
        && ids.iter().all(|id| authorized.contains(id))
    {
        return Ok(doc);
    }

    let confidential_scope = scope.scope(&["confidential"]);
    doc.add_filter(json!({
        "bool": {
            "should": [
                non_confidential,
                { "bool": { "must": [
                    { "term": { "confidential": { "_name": scope.name(&["confidential"]), "value": true } } },
                    { "bool": { "should": [
                        { "term": { "author_id": {
                            "_name": confidential_scope.name(&["as_author"]), "value": user.id } } },
                        { "term": { "assignee_id": {
                            "_name": confidential_scope.name(&["as_assignee"]), "value": user.id } } },
                        { "terms": {
                            "_name": confidential_scope.name(&["project", "membership", "id"]),
                            options.project_id_field(): authorized
                        } }
                    ] } }
                ] } }
            ]
        }
    }));
    Ok(doc)
}

/// Returns the scoped projects where the user has at least reporter access.
fn reporter_project_ids(user: &CurrentUser, scoped: &ProjectScope) -> Vec<u64> {
    let reporter = user.project_ids_with_min_access(access::REPORTER);
    match scoped {
        ProjectScope::Any => reporter,
        ProjectScope::Ids(ids) => reporter.into_iter().filter(|id| ids.contains(id)).collect(),
    }
}

/// Hides confidential namespace documents from users who may not read them.
///
/// Non-confidential documents need guest access in private namespaces; confidential ones need
/// reporter access.
pub fn by_group_confidentiality(
    mut doc: QueryDoc,
    options: &SearchOptions,
) -> Result<QueryDoc, BuildError> {
    requested_confidentiality(&mut doc, options);

    let user = options.user();
    if user.is_some_and(|u| u.can_read_all_resources) {
        return Ok(doc);
    }

    let scope = filters_scope().scope(&["confidentiality", "groups"]);
    let non_confidential = scope.scope(&["non_confidential"]);
    let mut should = vec![visible_namespace(&non_confidential, "public", visibility::PUBLIC)];

    if let Some(user) = user {
        if !user.external {
            should.push(visible_namespace(&non_confidential, "internal", visibility::INTERNAL));
        }
        should.extend(member_namespaces(user, options, &non_confidential, false, access::GUEST));
        should.extend(member_namespaces(
            user,
            options,
            &scope.scope(&["confidential"]),
            true,
            access::REPORTER,
        ));
    }

    doc.add_filter(json!({ "bool": { "should": should, "minimum_should_match": 1 } }));
    Ok(doc)
}

/// Non-confidential documents in namespaces of `level` visibility.
fn visible_namespace(scope: &NameScope, name: &str, level: u32) -> Value {
    json!({
        "bool": {
            "_name": scope.name(&[name]),
            "filter": [
                { "term": { "confidential": false } },
                { "term": { NAMESPACE_VISIBILITY_FIELD: level } }
            ]
        }
    })
}

/// Documents with the given confidentiality below groups where the user has `min_access`.
fn member_namespaces(
    user: &CurrentUser,
    options: &SearchOptions,
    scope: &NameScope,
    confidential: bool,
    min_access: u32,
) -> Option<Value> {
    let traversal_ids = traversal_ids_at_level(user.groups_with_min_access(min_access), user, options);
    if traversal_ids.is_empty() {
        return None;
    }
    let private = scope.scope(&["private"]);
    let mut filter = BoolExpr::named(private.to_string());
    filter.add(Occur::Filter, json!({ "term": { "confidential": confidential } }));
    filter.add(
        Occur::Should,
        Value::Array(ancestry_filter(&traversal_ids, options.traversal_ids_field(), &private)),
    );
    filter.to_bool_query()
}
