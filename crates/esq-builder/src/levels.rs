//! Visibility, feature access and membership levels.
//!
//! The numeric values are indexed alongside every document, so they must match the values the
//! indexer writes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Project and namespace visibility levels.
pub mod visibility {
    /// Visible to members only.
    pub const PRIVATE: u32 = 0;
    /// Visible to signed-in users who are not external.
    pub const INTERNAL: u32 = 10;
    /// Visible to everyone.
    pub const PUBLIC: u32 = 20;
}

/// Project feature access levels.
pub mod feature_access {
    /// Feature switched off.
    pub const DISABLED: u32 = 0;
    /// Feature visible to project members only.
    pub const PRIVATE: u32 = 10;
    /// Feature visible to everyone who can see the project.
    pub const ENABLED: u32 = 20;
}

/// Membership access levels.
pub mod access {
    /// Guest.
    pub const GUEST: u32 = 10;
    /// Planner.
    pub const PLANNER: u32 = 15;
    /// Reporter.
    pub const REPORTER: u32 = 20;
    /// Developer.
    pub const DEVELOPER: u32 = 30;
    /// Maintainer.
    pub const MAINTAINER: u32 = 40;
    /// Owner.
    pub const OWNER: u32 = 50;
}

/// A project feature that gates access to a document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Issues and issue-backed work items.
    Issues,
    /// Merge requests.
    MergeRequests,
    /// Repository code and commits.
    Repository,
    /// Wiki pages.
    Wiki,
    /// Project snippets.
    Snippets,
    /// CI builds.
    Builds,
    /// Pages sites.
    Pages,
    /// Container registry.
    ContainerRegistry,
    /// Package registry.
    PackageRegistry,
    /// Deployment environments.
    Environments,
}

impl Feature {
    /// Returns the feature name as indexed.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issues => "issues",
            Self::MergeRequests => "merge_requests",
            Self::Repository => "repository",
            Self::Wiki => "wiki",
            Self::Snippets => "snippets",
            Self::Builds => "builds",
            Self::Pages => "pages",
            Self::ContainerRegistry => "container_registry",
            Self::PackageRegistry => "package_registry",
            Self::Environments => "environments",
        }
    }

    /// Returns the document field holding this feature's access level.
    pub fn access_level_field(self) -> String {
        format!("{}_access_level", self.as_str())
    }

    /// Minimum membership needed to see a members-only feature.
    pub fn min_access_level(self) -> u32 {
        match self {
            Self::MergeRequests
            | Self::ContainerRegistry
            | Self::PackageRegistry
            | Self::Environments => access::REPORTER,
            _ => access::GUEST,
        }
    }

    /// Minimum membership needed to see the feature in a private project.
    pub fn min_access_level_for_private_project(self) -> u32 {
        match self {
            Self::Repository => access::REPORTER,
            other => other.min_access_level(),
        }
    }

    /// Custom-role ability that grants access regardless of membership level.
    pub fn ability(self) -> Option<&'static str> {
        match self {
            Self::Repository => Some("read_code"),
            _ => None,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
