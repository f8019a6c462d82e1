//! Project-level authorization: search level plus visibility and membership.
//!
//! Two encodings exist. The refactored one groups the user's memberships per feature into a
//! public/internal access branch and a private access branch; the legacy one is a flat union of
//! visibility permissions and memberships.

use esq_query::{BoolExpr, NameScope, Occur, QueryDoc};
use serde_json::{Value, json};

use crate::{
    BuildError,
    levels::{Feature, feature_access, visibility},
    options::SearchOptions,
    user::CurrentUser,
};

use super::{
    MembershipFilter,
    access::{
        dedup, project_ids_for_features, projects_at_level, traversal_ids_at_level,
        user_traversal_ids,
    },
    ancestry_filter, filters_scope, search_level_filter,
};

/// Limits the search to the requested level, then to what the user may see there.
///
/// Users who read everything only get the feature access clauses, so disabled features stay
/// hidden from them too.
pub fn by_search_level_and_membership(
    doc: QueryDoc,
    options: &SearchOptions,
    strategy: MembershipFilter,
) -> Result<QueryDoc, BuildError> {
    let level = options.search_level()?;
    let mut doc = search_level_filter(doc, options)?;
    let scope = filters_scope().scope(&["permissions", level.as_str()]);

    let filter = match strategy {
        MembershipFilter::Refactored => membership_filter(options, &scope).to_bool_query(),
        MembershipFilter::Legacy => legacy_membership_filter(options, &scope),
    };
    doc.add_filter(filter);
    Ok(doc)
}

/// Public and internal visibility for signed-in users, public only for anonymous and external
/// users, nothing for users who read everything.
pub(super) fn visibility_level_clause(
    user: Option<&CurrentUser>,
    field: &str,
    scope: &NameScope,
) -> Option<Value> {
    match user {
        Some(user) if user.can_read_all_resources => None,
        Some(user) if !user.external => Some(json!({
            "terms": {
                "_name": scope.name(&[field, "public_and_internal"]),
                field: [visibility::PUBLIC, visibility::INTERNAL]
            }
        })),
        _ => Some(json!({
            "terms": { "_name": scope.name(&[field, "public"]), field: [visibility::PUBLIC] }
        })),
    }
}

/// One clause per feature requiring it to be enabled, or enabled or private for users who read
/// everything.
fn feature_visibility_clauses(
    features: &[Feature],
    user: Option<&CurrentUser>,
    scope: &NameScope,
) -> Value {
    let reads_everything = user.is_some_and(|u| u.can_read_all_resources);
    let (allowed, context) = if reads_everything {
        (vec![feature_access::ENABLED, feature_access::PRIVATE], "enabled_or_private")
    } else {
        (vec![feature_access::ENABLED], "enabled")
    };

    features
        .iter()
        .map(|feature| {
            let field = feature.access_level_field();
            json!({ "terms": { "_name": scope.name(&[field.as_str(), context]), field: allowed } })
        })
        .collect()
}

/// Requires the feature to be enabled or members-only.
fn feature_enabled_or_private(feature: Feature, scope: &NameScope) -> Value {
    let field = feature.access_level_field();
    json!({
        "terms": {
            "_name": scope.name(&[field.as_str(), "enabled_or_private"]),
            field: [feature_access::ENABLED, feature_access::PRIVATE]
        }
    })
}

/// Builds the refactored membership filter.
fn membership_filter(options: &SearchOptions, scope: &NameScope) -> BoolExpr {
    let user = options.user();
    let mut filter = BoolExpr::new();

    if let Some(user) = user.filter(|u| !u.can_read_all_resources) {
        add_group_membership(&mut filter, user, options, scope);
        add_project_membership(&mut filter, user, options, scope);
    }

    let mut public_and_internal = BoolExpr::new();
    public_and_internal.add(
        Occur::Filter,
        visibility_level_clause(user, options.visibility_level_field(), scope),
    );
    public_and_internal.add(
        Occur::Should,
        feature_visibility_clauses(&options.features, user, scope),
    );

    match user {
        Some(user) if !user.can_read_all_resources => {
            filter.add(Occur::Should, public_and_internal.to_bool_query());
        }
        _ => filter.merge(public_and_internal),
    }
    filter
}

/// Ancestry paths of the groups granting a feature, split by the access they grant.
#[derive(Debug, PartialEq)]
struct AccessBuckets<T> {
    /// Entries visible when the project is public or internal.
    public_and_internal: Vec<T>,
    /// Entries visible whatever the project visibility.
    private: Vec<T>,
}

impl<T: PartialEq + Clone> AccessBuckets<T> {
    /// Splits `allowed` into buckets for `feature`.
    ///
    /// When the feature needs the same access in private projects, every allowed entry reaches
    /// private projects. Otherwise only entries also in `private_allowed` do; entries that are
    /// only in `private_allowed` are dropped.
    fn split(feature: Feature, allowed: &[T], private_allowed: &[T]) -> Self {
        if feature.min_access_level() == feature.min_access_level_for_private_project() {
            return Self {
                public_and_internal: Vec::new(),
                private: allowed.to_vec(),
            };
        }
        let (private, public_and_internal): (Vec<T>, Vec<T>) = allowed
            .iter()
            .cloned()
            .partition(|entry| private_allowed.contains(entry));
        Self {
            public_and_internal,
            private,
        }
    }
}

/// Adds the user's group memberships.
fn add_group_membership(
    filter: &mut BoolExpr,
    user: &CurrentUser,
    options: &SearchOptions,
    scope: &NameScope,
) {
    if user.groups.is_empty() {
        return;
    }
    let field = options.traversal_ids_field();

    if options.features.is_empty() {
        let traversal_ids: Vec<&str> =
            user.groups.iter().map(|g| g.traversal_ids.as_str()).collect();
        filter.add(
            Occur::Should,
            Value::Array(ancestry_filter(&traversal_ids, field, scope)),
        );
        return;
    }

    for feature in &options.features {
        let ability = feature.ability();
        let granted = |level: u32| {
            user.groups.iter().filter(move |g| {
                g.access_level >= level || ability.is_some_and(|a| g.has_ability(a))
            })
        };
        let allowed = traversal_ids_at_level(granted(feature.min_access_level()), user, options);
        let private_allowed = traversal_ids_at_level(
            granted(feature.min_access_level_for_private_project()),
            user,
            options,
        );
        let buckets = AccessBuckets::split(*feature, &allowed, &private_allowed);

        if !buckets.public_and_internal.is_empty() {
            let access = scope.scope(&["public_and_internal_access"]);
            let mut branch = BoolExpr::new();
            branch.add(Occur::Filter, feature_enabled_or_private(*feature, &access));
            branch.add(Occur::Filter, public_or_internal_clause(options, &access));
            branch.add(
                Occur::Should,
                Value::Array(ancestry_filter(&buckets.public_and_internal, field, &access)),
            );
            filter.add(Occur::Should, branch.to_bool_query());
        }
        if !buckets.private.is_empty() {
            let access = scope.scope(&["private_access"]);
            let mut branch = BoolExpr::new();
            branch.add(Occur::Filter, feature_enabled_or_private(*feature, &access));
            branch.add(
                Occur::Should,
                Value::Array(ancestry_filter(&buckets.private, field, &access)),
            );
            filter.add(Occur::Should, branch.to_bool_query());
        }
    }
}

/// Requires a public or internal project.
fn public_or_internal_clause(options: &SearchOptions, scope: &NameScope) -> Value {
    json!({
        "terms": {
            "_name": scope.name(&["project_visibility_level", "public_or_internal"]),
            options.visibility_level_field(): [visibility::PUBLIC, visibility::INTERNAL]
        }
    })
}

/// Requires one of the member projects.
fn member_projects_clause(ids: &[u64], options: &SearchOptions, scope: &NameScope) -> Value {
    json!({
        "terms": { "_name": scope.name(&["project", "member"]), options.project_id_field(): ids }
    })
}

/// Adds the user's project memberships.
fn add_project_membership(
    filter: &mut BoolExpr,
    user: &CurrentUser,
    options: &SearchOptions,
    scope: &NameScope,
) {
    let projects = projects_at_level(user, options);
    if projects.is_empty() {
        return;
    }

    if options.features.is_empty() {
        let ids: Vec<u64> = projects.iter().map(|p| p.id).collect();
        filter.add(Occur::Should, member_projects_clause(&ids, options, scope));
        return;
    }

    for feature in &options.features {
        let ability = feature.ability();
        let granted = |level: u32| {
            let ids = projects
                .iter()
                .filter(|p| p.public_or_visible_at(level))
                .chain(
                    projects
                        .iter()
                        .filter(|p| ability.is_some_and(|a| p.has_ability(a))),
                )
                .map(|p| p.id)
                .collect();
            dedup(ids)
        };
        let allowed = granted(feature.min_access_level());
        let private_allowed = granted(feature.min_access_level_for_private_project());
        let buckets = AccessBuckets::split(*feature, &allowed, &private_allowed);

        if !buckets.public_and_internal.is_empty() {
            let access = scope.scope(&["public_and_internal_access"]);
            let mut branch = BoolExpr::new();
            branch.add(Occur::Filter, feature_enabled_or_private(*feature, &access));
            branch.add(Occur::Filter, public_or_internal_clause(options, &access));
            branch.add(
                Occur::Filter,
                member_projects_clause(&buckets.public_and_internal, options, &access),
            );
            filter.add(Occur::Should, branch.to_bool_query());
        }
        if !buckets.private.is_empty() {
            let access = scope.scope(&["private_access"]);
            let mut branch = BoolExpr::new();
            branch.add(Occur::Filter, feature_enabled_or_private(*feature, &access));
            branch.add(Occur::Filter, member_projects_clause(&buckets.private, options, &access));
            filter.add(Occur::Should, branch.to_bool_query());
        }
    }
}

/// Builds the legacy filter: `should` of visibility permissions and memberships.
///
/// Returns `None` when neither side contributes a clause.
fn legacy_membership_filter(options: &SearchOptions, scope: &NameScope) -> Option<Value> {
    let user = options.user();

    let mut permissions = BoolExpr::new();
    permissions.add(
        Occur::Filter,
        visibility_level_clause(user, options.visibility_level_field(), scope),
    );
    permissions.add(
        Occur::Should,
        feature_visibility_clauses(&options.features, user, scope),
    );

    let membership = user
        .filter(|u| !u.can_read_all_resources)
        .map(|user| legacy_memberships(user, options, scope))
        .unwrap_or_default();

    let should: Vec<Value> = [permissions.to_bool_query(), membership.to_bool_query()]
        .into_iter()
        .flatten()
        .collect();
    if should.is_empty() {
        return None;
    }
    Some(json!({
        "bool": { "_name": scope.to_string(), "should": should, "minimum_should_match": 1 }
    }))
}

/// Group ancestry and member projects of the legacy filter.
fn legacy_memberships(user: &CurrentUser, options: &SearchOptions, scope: &NameScope) -> BoolExpr {
    let mut membership = BoolExpr::new();

    let traversal_ids = user_traversal_ids(user, options);
    if !traversal_ids.is_empty() {
        membership.minimum_should_match = Some(1);
        membership.add(
            Occur::Should,
            Value::Array(ancestry_filter(&traversal_ids, options.traversal_ids_field(), scope)),
        );
    }

    let projects = projects_at_level(user, options);
    let project_ids = if options.features.is_empty() {
        projects.iter().map(|p| p.id).collect()
    } else {
        project_ids_for_features(&projects, user, &options.features)
    };
    if !project_ids.is_empty() {
        membership.minimum_should_match = Some(1);
        membership.add(Occur::Should, member_projects_clause(&project_ids, options, scope));
    }

    if !membership.is_empty() && !options.features.is_empty() {
        let mut features = BoolExpr::new();
        for feature in &options.features {
            features.add(Occur::Should, feature_enabled_or_private(*feature, scope));
        }
        membership.add(Occur::Filter, features.to_bool_query());
    }
    membership
}
