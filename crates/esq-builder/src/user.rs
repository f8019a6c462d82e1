//! Pre-resolved authorization data for the searching user.
//!
//! Nothing here decides policy. The caller's authorization layer resolves memberships, access
//! levels and custom abilities, and the filters only encode those decisions as query clauses.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::levels::{Feature, access, feature_access, visibility};

/// The user a search runs on behalf of.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CurrentUser {
    /// User id.
    pub id: u64,
    /// Username.
    pub username: String,
    /// External users never see internal projects.
    pub external: bool,
    /// Admins and auditors read everything.
    pub can_read_all_resources: bool,
    /// Admins also see hidden content.
    pub can_admin_all_resources: bool,
    /// When false, a search may cover at most one project.
    pub can_read_cross_project: bool,
    /// Whether any of the user's groups has AI features available.
    pub any_group_with_ai_available: bool,
    /// Group memberships, direct or inherited.
    pub groups: Vec<GroupMembership>,
    /// Project memberships, direct or through shared groups.
    pub projects: Vec<ProjectMembership>,
}

impl Default for CurrentUser {
    fn default() -> Self {
        Self {
            id: 0,
            username: String::new(),
            external: false,
            can_read_all_resources: false,
            can_admin_all_resources: false,
            can_read_cross_project: true,
            any_group_with_ai_available: false,
            groups: Vec::new(),
            projects: Vec::new(),
        }
    }
}

/// A group the user belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GroupMembership {
    /// Group id.
    pub id: u64,
    /// Ancestry path such as `9970-123-`.
    pub traversal_ids: String,
    /// Effective access level.
    pub access_level: u32,
    /// Custom-role abilities granted in this group.
    pub abilities: Vec<String>,
}

/// A project the user is authorized for.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProjectMembership {
    /// Project id.
    pub id: u64,
    /// Id of the namespace the project lives in.
    pub namespace_id: u64,
    /// Ancestry path of the project's namespace.
    pub traversal_ids: String,
    /// Effective access level.
    pub access_level: u32,
    /// Custom-role abilities granted in this project.
    pub abilities: Vec<String>,
    /// Project visibility level.
    pub visibility_level: u32,
    /// Feature access levels; features not listed are enabled.
    pub feature_access_levels: BTreeMap<Feature, u32>,
}

impl Default for ProjectMembership {
    fn default() -> Self {
        Self {
            id: 0,
            namespace_id: 0,
            traversal_ids: String::new(),
            access_level: access::GUEST,
            abilities: Vec::new(),
            visibility_level: visibility::PRIVATE,
            feature_access_levels: BTreeMap::new(),
        }
    }
}

/// A namespace known to the search request.
///
/// Group-level searches and traversal-id authorization need the ancestry of the searched
/// namespaces and the projects inside them; the caller resolves both up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Namespace {
    /// Namespace id.
    pub id: u64,
    /// Ancestry path such as `9970-123-`.
    pub traversal_ids: String,
    /// Every project in the namespace hierarchy.
    pub project_ids: Vec<u64>,
}

impl CurrentUser {
    /// Returns the membership for project `id`.
    pub fn project(&self, id: u64) -> Option<&ProjectMembership> {
        self.projects.iter().find(|p| p.id == id)
    }

    /// Returns the ids of groups the user belongs to.
    pub fn group_ids(&self) -> Vec<u64> {
        self.groups.iter().map(|g| g.id).collect()
    }

    /// Returns groups where the user has at least `level`.
    pub fn groups_with_min_access(&self, level: u32) -> impl Iterator<Item = &GroupMembership> {
        self.groups.iter().filter(move |g| g.access_level >= level)
    }

    /// Returns the ids of projects where the user has at least `level`.
    pub fn project_ids_with_min_access(&self, level: u32) -> Vec<u64> {
        self.projects
            .iter()
            .filter(|p| p.access_level >= level)
            .map(|p| p.id)
            .collect()
    }

    /// Returns true when `feature` of project `project_id` is readable by this user.
    ///
    /// Projects the user is not a member of are only readable by users who read everything.
    pub fn can_read_feature(&self, project_id: u64, feature: Feature) -> bool {
        match self.project(project_id) {
            Some(project) => project.feature_visible(feature, self.can_read_all_resources),
            None => self.can_read_all_resources,
        }
    }

    /// Returns the ids of every namespace in the ancestry of the user's projects.
    pub fn project_ancestry_namespace_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = Vec::new();
        for project in &self.projects {
            for id in parse_traversal_ids(&project.traversal_ids) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        ids
    }
}

impl GroupMembership {
    /// Returns true when the membership carries `ability`.
    pub fn has_ability(&self, ability: &str) -> bool {
        self.abilities.iter().any(|a| a == ability)
    }
}

impl ProjectMembership {
    /// Returns the access level of `feature`.
    pub fn feature_access_level(&self, feature: Feature) -> u32 {
        self.feature_access_levels
            .get(&feature)
            .copied()
            .unwrap_or(feature_access::ENABLED)
    }

    /// Returns true when the membership carries `ability`.
    pub fn has_ability(&self, ability: &str) -> bool {
        self.abilities.iter().any(|a| a == ability)
    }

    /// Returns true when the project is public or the user has at least `level`.
    pub fn public_or_visible_at(&self, level: u32) -> bool {
        self.visibility_level == visibility::PUBLIC || self.access_level >= level
    }

    /// Returns true when `feature` is visible to the member.
    fn feature_visible(&self, feature: Feature, reads_everything: bool) -> bool {
        let level = self.feature_access_level(feature);
        if level == feature_access::DISABLED {
            return false;
        }
        if reads_everything {
            return true;
        }
        let required = if self.visibility_level == visibility::PRIVATE {
            feature.min_access_level_for_private_project()
        } else {
            feature.min_access_level()
        };
        if level == feature_access::ENABLED && self.visibility_level != visibility::PRIVATE {
            return true;
        }
        self.access_level >= required
    }
}

/// Parses an ancestry path such as `9970-123-` into namespace ids.
pub fn parse_traversal_ids(traversal_ids: &str) -> Vec<u64> {
    traversal_ids
        .split('-')
        .filter_map(|part| part.parse().ok())
        .collect()
}
