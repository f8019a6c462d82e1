//! Project-id based authorization.
//!
//! Older document types authorize by listing project ids (optionally through a `has_parent`
//! join on the project document) instead of the search-level and membership filter. Group
//! searches on types indexed with traversal ids use an ancestry filter instead, minus the
//! projects in those groups the user may not read.

use esq_query::{NameScope, QueryDoc};
use serde_json::{Value, json};

use crate::{
    BuildError,
    levels::{Feature, feature_access, visibility},
    options::{ProjectScope, SearchOptions},
    user::{CurrentUser, Namespace},
};

use super::{access::project_ids_with_feature, attributes::namespace_ancestry_filter, filters_scope};

/// Join field of the project parent document.
const PROJECT_PARENT_ID_FIELD: &str = "id";

/// Limits the search to projects the user may read.
///
/// Prefer `by_search_level_and_membership` for new document types.
pub fn by_project_authorization(
    mut doc: QueryDoc,
    options: &SearchOptions,
) -> Result<QueryDoc, BuildError> {
    if options.project_ids.is_any()
        || options.group_ids.is_empty()
        || !options.authorization_use_traversal_ids
    {
        doc.add_filter(project_ids_filter(options));
        return Ok(doc);
    }

    let namespaces = authorized_namespaces(options);
    if namespaces.is_empty() {
        doc.add_filter(project_ids_filter(options));
        return Ok(doc);
    }

    doc.add_must_not(rejected_projects_filter(&namespaces, options));
    let traversal_ids: Vec<&str> = namespaces.iter().map(|n| n.traversal_ids.as_str()).collect();
    doc.add_filter(namespace_ancestry_filter(&traversal_ids, options));
    Ok(doc)
}

/// Returns the searched namespaces the user is a member of.
fn authorized_namespaces(options: &SearchOptions) -> Vec<&Namespace> {
    let Some(user) = options.user() else {
        return Vec::new();
    };
    let member_of = user.group_ids();
    options
        .group_ids
        .iter()
        .filter(|id| member_of.contains(*id))
        .filter_map(|id| options.namespace(*id))
        .collect()
}

/// Selects documents of readable projects.
fn project_ids_filter(options: &SearchOptions) -> Value {
    let scope = filters_scope().scope(&["project"]);
    let should = project_conditions(options, &scope);

    if options.no_join_project {
        json!({ "bool": { "_name": scope.to_string(), "should": should } })
    } else {
        json!({
            "has_parent": {
                "_name": format!("{scope}:parent"),
                "parent_type": "project",
                "query": { "bool": { "should": should } }
            }
        })
    }
}

/// Member projects, plus public and internal projects when requested.
fn project_conditions(options: &SearchOptions, scope: &NameScope) -> Vec<Value> {
    let user = options.user();
    let mut conditions = projects_by_membership(options, scope);

    if options.public_and_internal_projects {
        let scope = scope.scope(&["visibility"]);
        if user.is_some_and(|u| !u.external) {
            conditions.extend(projects_by_visibility(visibility::INTERNAL, options, &scope));
        }
        conditions.extend(projects_by_visibility(visibility::PUBLIC, options, &scope));
    }
    conditions
}

/// Grants every project the user is a member of whose feature is not disabled.
fn projects_by_membership(options: &SearchOptions, scope: &NameScope) -> Vec<Value> {
    let user = options.user();
    let id_field = if options.no_join_project {
        options.project_id_field()
    } else {
        PROJECT_PARENT_ID_FIELD
    };
    let project_ids = options.scoped_project_ids();
    let condition = |ids: &[u64]| match &project_ids {
        ProjectScope::Any => json!({
            "term": {
                options.visibility_level_field(): {
                    "_name": scope.name(&["any"]),
                    "value": visibility::PRIVATE
                }
            }
        }),
        ProjectScope::Ids(_) => {
            json!({ "terms": { "_name": scope.name(&["membership", "id"]), id_field: ids } })
        }
    };

    if options.features.is_empty() {
        return vec![condition(project_ids.ids())];
    }

    options
        .features
        .iter()
        .map(|feature| {
            let readable = project_ids_with_feature(project_ids.ids(), user, *feature);
            let field = feature.access_level_field();
            let limit = json!({
                "terms": {
                    "_name": scope.name(&[feature.as_str(), "enabled_or_private"]),
                    field: [feature_access::ENABLED, feature_access::PRIVATE]
                }
            });
            json!({ "bool": { "filter": [condition(&readable), limit] } })
        })
        .collect()
}

/// Grants projects of `level` visibility whose feature is enabled, or also private for users
/// who read everything.
fn projects_by_visibility(level: u32, options: &SearchOptions, scope: &NameScope) -> Vec<Value> {
    let scope = scope.scope(&[level.to_string()]);
    let condition = json!({
        "term": { options.visibility_level_field(): { "_name": scope.to_string(), "value": level } }
    });
    let members_only = options.can_read_all_resources();

    if options.features.is_empty() {
        return vec![condition];
    }
    options
        .features
        .iter()
        .map(|feature| {
            let scope = scope.scope(&[feature.as_str(), "access_level"]);
            json!({
                "bool": {
                    "_name": scope.to_string(),
                    "filter": [condition, feature_limit(*feature, members_only, &scope)]
                }
            })
        })
        .collect()
}

/// Requires `feature` to be enabled, or enabled or private when `members_only`.
fn feature_limit(feature: Feature, members_only: bool, scope: &NameScope) -> Value {
    let field = feature.access_level_field();
    if members_only {
        json!({
            "terms": {
                "_name": scope.name(&["enabled_or_private"]),
                field: [feature_access::ENABLED, feature_access::PRIVATE]
            }
        })
    } else {
        json!({
            "term": { field: { "_name": scope.name(&["enabled"]), "value": feature_access::ENABLED } }
        })
    }
}

/// Excludes projects inside `namespaces` whose feature the user may not read.
fn rejected_projects_filter(namespaces: &[&Namespace], options: &SearchOptions) -> Option<Value> {
    let ProjectScope::Ids(scoped) = options.scoped_project_ids() else {
        return None;
    };
    let allowed = allowed_project_ids(&scoped, options.user(), &options.features);
    let rejected: Vec<u64> = namespaces
        .iter()
        .flat_map(|n| n.project_ids.iter().copied())
        .filter(|id| !allowed.contains(id))
        .collect();

    Some(json!({
        "terms": {
            "_name": filters_scope().name(&["reject_projects"]),
            options.project_id_field(): rejected
        }
    }))
}

/// Returns the scoped projects whose gating features the user may read.
fn allowed_project_ids(scoped: &[u64], user: Option<&CurrentUser>, features: &[Feature]) -> Vec<u64> {
    if features.is_empty() {
        return scoped.to_vec();
    }
    features
        .iter()
        .flat_map(|feature| project_ids_with_feature(scoped, user, *feature))
        .collect()
}
