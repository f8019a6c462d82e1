//! Narrowing the user's memberships to the searched level.

use std::collections::BTreeSet;

use crate::{
    levels::Feature,
    options::{ProjectScope, SearchLevel, SearchOptions},
    user::{CurrentUser, GroupMembership, ProjectMembership},
};

/// Returns the ancestry paths of `groups` that are relevant at the searched level.
///
/// Global searches keep every path. Group searches keep paths that overlap a searched group:
/// a membership below the searched group contributes its own path, a membership above it
/// contributes the searched group's path. Project searches keep memberships on the ancestry of
/// a searched project.
pub(super) fn traversal_ids_at_level<'a>(
    groups: impl IntoIterator<Item = &'a GroupMembership>,
    user: &CurrentUser,
    options: &SearchOptions,
) -> Vec<String> {
    let level = options.search_level.unwrap_or(SearchLevel::Global);
    let searched = match level {
        SearchLevel::Global => Vec::new(),
        SearchLevel::Group => options.searched_group_traversal_ids(),
        SearchLevel::Project => searched_project_traversal_ids(user, options),
    };

    let mut traversal_ids: Vec<String> = Vec::new();
    for group in groups {
        let candidates: Vec<&str> = match level {
            SearchLevel::Global => vec![group.traversal_ids.as_str()],
            SearchLevel::Group => searched
                .iter()
                .filter_map(|target| {
                    if group.traversal_ids.starts_with(target.as_str()) {
                        Some(group.traversal_ids.as_str())
                    } else if target.starts_with(group.traversal_ids.as_str()) {
                        Some(target.as_str())
                    } else {
                        None
                    }
                })
                .collect(),
            SearchLevel::Project => searched
                .iter()
                .filter(|target| target.starts_with(group.traversal_ids.as_str()))
                .map(|_| group.traversal_ids.as_str())
                .collect(),
        };
        for candidate in candidates {
            if !candidate.is_empty() && !traversal_ids.iter().any(|t| t == candidate) {
                traversal_ids.push(candidate.to_string());
            }
        }
    }
    traversal_ids
}

/// Returns the ancestry paths of the user's groups that are relevant at the searched level.
pub(super) fn user_traversal_ids(user: &CurrentUser, options: &SearchOptions) -> Vec<String> {
    traversal_ids_at_level(&user.groups, user, options)
}

/// Returns the namespace ancestry of every searched project.
fn searched_project_traversal_ids(user: &CurrentUser, options: &SearchOptions) -> Vec<String> {
    let ProjectScope::Ids(ids) = options.scoped_project_ids() else {
        return Vec::new();
    };
    ids.iter()
        .filter_map(|id| {
            user.project(*id)
                .map(|p| p.traversal_ids.clone())
                .or_else(|| {
                    options
                        .namespaces
                        .iter()
                        .find(|n| n.project_ids.contains(id))
                        .map(|n| n.traversal_ids.clone())
                })
        })
        .collect()
}

/// Returns the user's projects that fall inside the searched level.
pub(super) fn projects_at_level<'a>(
    user: &'a CurrentUser,
    options: &SearchOptions,
) -> Vec<&'a ProjectMembership> {
    match options.search_level.unwrap_or(SearchLevel::Global) {
        SearchLevel::Global => user.projects.iter().collect(),
        SearchLevel::Group => {
            let searched = options.searched_group_traversal_ids();
            user.projects
                .iter()
                .filter(|p| {
                    searched.iter().any(|t| p.traversal_ids.starts_with(t.as_str()))
                        || options.group_ids.contains(&p.namespace_id)
                })
                .collect()
        }
        SearchLevel::Project => match options.scoped_project_ids() {
            ProjectScope::Any => user.projects.iter().collect(),
            ProjectScope::Ids(ids) => user
                .projects
                .iter()
                .filter(|p| ids.contains(&p.id))
                .collect(),
        },
    }
}

/// Returns `ids` narrowed to projects where `feature` is readable by `user`.
pub(super) fn project_ids_with_feature(
    ids: &[u64],
    user: Option<&CurrentUser>,
    feature: Feature,
) -> Vec<u64> {
    let Some(user) = user else {
        return Vec::new();
    };
    ids.iter()
        .copied()
        .filter(|id| user.can_read_feature(*id, feature))
        .collect()
}

/// Returns projects where any of `features` is readable, by visibility or custom ability.
pub(super) fn project_ids_for_features(
    projects: &[&ProjectMembership],
    user: &CurrentUser,
    features: &[Feature],
) -> Vec<u64> {
    let ids: Vec<u64> = projects.iter().map(|p| p.id).collect();
    let mut allowed: Vec<u64> = Vec::new();
    for feature in features {
        allowed.extend(project_ids_with_feature(&ids, Some(user), *feature));
    }
    for project in projects {
        if features
            .iter()
            .filter_map(|f| f.ability())
            .any(|ability| project.has_ability(ability))
        {
            allowed.push(project.id);
        }
    }
    dedup(allowed)
}

/// Removes repeated ids, keeping first occurrences in order.
pub(super) fn dedup(ids: Vec<u64>) -> Vec<u64> {
    let mut seen = BTreeSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{levels::access, user::Namespace};

    fn group(id: u64, traversal_ids: &str) -> GroupMembership {
        GroupMembership {
            id,
            traversal_ids: traversal_ids.into(),
            access_level: access::DEVELOPER,
            abilities: Vec::new(),
        }
    }

    fn project(id: u64, traversal_ids: &str) -> ProjectMembership {
        ProjectMembership {
            id,
            traversal_ids: traversal_ids.into(),
            access_level: access::DEVELOPER,
            ..ProjectMembership::default()
        }
    }

    fn user() -> CurrentUser {
        CurrentUser {
            id: 1,
            groups: vec![group(1, "1-"), group(5, "1-2-5-"), group(9, "9-")],
            projects: vec![project(10, "1-2-"), project(11, "9-"), project(12, "1-2-5-")],
            ..CurrentUser::default()
        }
    }

    fn level(level: SearchLevel) -> SearchOptions {
        SearchOptions {
            search_level: Some(level),
            group_ids: vec![2],
            namespaces: vec![Namespace {
                id: 2,
                traversal_ids: "1-2-".into(),
                project_ids: vec![10, 12, 13],
            }],
            project_ids: ProjectScope::Ids(vec![12]),
            ..SearchOptions::default()
        }
    }

    #[test]
    fn global_keeps_every_group() {
        let user = user();
        assert_eq!(
            user_traversal_ids(&user, &level(SearchLevel::Global)),
            vec!["1-", "1-2-5-", "9-"]
        );
    }

    #[test]
    fn group_level_clamps_to_searched_group() {
        let user = user();
        assert_eq!(
            user_traversal_ids(&user, &level(SearchLevel::Group)),
            vec!["1-2-", "1-2-5-"]
        );
    }

    #[test]
    fn project_level_keeps_project_ancestors() {
        let user = user();
        assert_eq!(
            user_traversal_ids(&user, &level(SearchLevel::Project)),
            vec!["1-", "1-2-5-"]
        );
    }

    #[test]
    fn projects_by_level() {
        let user = user();
        let ids = |level: SearchLevel| -> Vec<u64> {
            projects_at_level(&user, &self::level(level))
                .iter()
                .map(|p| p.id)
                .collect()
        };
        assert_eq!(ids(SearchLevel::Global), vec![10, 11, 12]);
        assert_eq!(ids(SearchLevel::Group), vec![10, 12]);
        assert_eq!(ids(SearchLevel::Project), vec![12]);
    }

    #[test]
    fn features_and_abilities_grant_projects() {
        let mut user = user();
        user.projects[1].access_level = access::GUEST;
        user.projects[1].abilities = vec!["read_code".into()];
        user.projects[2].access_level = access::GUEST;
        let projects: Vec<&ProjectMembership> = user.projects.iter().collect();

        assert_eq!(
            project_ids_for_features(&projects, &user, &[Feature::Repository]),
            vec![10, 11]
        );
    }

    #[test]
    fn anonymous_users_read_no_features() {
        assert!(project_ids_with_feature(&[1, 2], None, Feature::Issues).is_empty());
    }

    #[test]
    fn dedup_keeps_order() {
        assert_eq!(dedup(vec![3, 1, 3, 2, 1]), vec![3, 1, 2]);
        assert_eq!(dedup((0..1000).chain(0..1000).collect()), (0..1000).collect::<Vec<u64>>());
    }
}
