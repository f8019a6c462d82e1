//! Authorization for documents that belong to a namespace rather than a project.

use esq_query::{BoolExpr, Occur, QueryDoc};
use serde_json::{Value, json};

use crate::{BuildError, levels::visibility, options::SearchOptions};

use super::{
    access::user_traversal_ids, ancestry_filter, filters_scope, membership::visibility_level_clause,
    search_level_filter,
};

/// Field holding a document's namespace visibility level.
const NAMESPACE_VISIBILITY_FIELD: &str = "namespace_visibility_level";

/// Limits the search to the requested level, then to namespaces the user may see.
///
/// Public and internal namespaces are matched by visibility. Private namespaces need a group
/// membership on their ancestry, or a project membership somewhere below them. Users who read
/// everything only get the search-level filter.
pub fn by_search_level_and_group_membership(
    doc: QueryDoc,
    options: &SearchOptions,
) -> Result<QueryDoc, BuildError> {
    let level = options.search_level()?;
    let mut doc = search_level_filter(doc, options)?;
    let user = options.user();
    if user.is_some_and(|u| u.can_read_all_resources) {
        return Ok(doc);
    }

    let scope = filters_scope().scope(&["permissions", level.as_str()]);
    let private = json!({
        "terms": {
            "_name": scope.name(&[NAMESPACE_VISIBILITY_FIELD, "private"]),
            NAMESPACE_VISIBILITY_FIELD: [visibility::PRIVATE]
        }
    });

    let mut permissions = BoolExpr::new();
    permissions.add(
        Occur::Filter,
        visibility_level_clause(user, NAMESPACE_VISIBILITY_FIELD, &scope),
    );
    let mut should: Vec<Value> = vec![json!({ "bool": permissions.to_h() })];

    if let Some(user) = user {
        let traversal_ids = user_traversal_ids(user, options);
        if !traversal_ids.is_empty() {
            let mut groups = BoolExpr::new();
            groups.add(Occur::Must, private.clone());
            groups.add(
                Occur::Should,
                Value::Array(ancestry_filter(&traversal_ids, options.traversal_ids_field(), &scope)),
            );
            should.extend(groups.to_bool_query());
        }

        let namespace_ids = user.project_ancestry_namespace_ids();
        if !namespace_ids.is_empty() {
            let mut projects = BoolExpr::new();
            projects.add(Occur::Must, private);
            projects.add(
                Occur::Must,
                json!({
                    "terms": { "_name": scope.name(&["project", "membership"]), "namespace_id": namespace_ids }
                }),
            );
            should.extend(projects.to_bool_query());
        }
    }

    doc.add_filter(json!({
        "bool": { "_name": scope.to_string(), "should": should, "minimum_should_match": 1 }
    }));
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        levels::access,
        options::SearchLevel,
        user::{CurrentUser, GroupMembership, Namespace, ProjectMembership},
    };

    fn options(user: Option<CurrentUser>) -> SearchOptions {
        SearchOptions {
            current_user: user,
            search_level: Some(SearchLevel::Group),
            group_ids: vec![2],
            namespaces: vec![Namespace {
                id: 2,
                traversal_ids: "1-2-".into(),
                project_ids: Vec::new(),
            }],
            ..SearchOptions::default()
        }
    }

    #[test]
    fn anonymous_users_see_public_namespaces() {
        let doc = by_search_level_and_group_membership(QueryDoc::default(), &options(None)).unwrap();
        assert_eq!(
            doc.filters()[1],
            json!({ "bool": {
                "_name": "filters:permissions:group",
                "should": [{ "bool": { "filter": [{ "terms": {
                    "_name": "filters:permissions:group:namespace_visibility_level:public",
                    "namespace_visibility_level": [20]
                } }] } }],
                "minimum_should_match": 1
            } })
        );
    }

    #[test]
    fn members_see_private_namespaces_below_their_groups() {
        let user = CurrentUser {
            groups: vec![GroupMembership {
                id: 2,
                traversal_ids: "1-2-".into(),
                access_level: access::GUEST,
                abilities: Vec::new(),
            }],
            projects: vec![ProjectMembership {
                id: 30,
                traversal_ids: "1-3-".into(),
                ..ProjectMembership::default()
            }],
            ..CurrentUser::default()
        };
        let doc = by_search_level_and_group_membership(QueryDoc::default(), &options(Some(user)))
            .unwrap();
        let should = doc.filters()[1]["bool"]["should"].as_array().unwrap().clone();

        assert_eq!(
            should[0]["bool"]["filter"][0]["terms"]["namespace_visibility_level"],
            json!([20, 10])
        );
        assert_eq!(
            should[1],
            json!({ "bool": {
                "must": [{ "terms": {
                    "_name": "filters:permissions:group:namespace_visibility_level:private",
                    "namespace_visibility_level": [0]
                } }],
                "should": [{ "prefix": { "traversal_ids": {
                    "_name": "filters:permissions:group:ancestry_filter:descendants", "value": "1-2-"
                } } }],
                "minimum_should_match": 1
            } })
        );
        assert_eq!(
            should[2]["bool"]["must"][1],
            json!({ "terms": { "_name": "filters:permissions:group:project:membership", "namespace_id": [1, 3] } })
        );
    }

    #[test]
    fn admins_only_get_the_level_filter() {
        let admin = CurrentUser {
            can_read_all_resources: true,
            ..CurrentUser::default()
        };
        let doc =
            by_search_level_and_group_membership(QueryDoc::default(), &options(Some(admin))).unwrap();
        assert_eq!(doc.filters().len(), 1);
        assert_eq!(doc.filters()[0]["bool"]["_name"], json!("filters:level:group"));
    }

    #[test]
    fn requires_search_level() {
        assert_eq!(
            by_search_level_and_group_membership(QueryDoc::default(), &SearchOptions::default()),
            Err(BuildError::MissingSearchLevel)
        );
    }
}
