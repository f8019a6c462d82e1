//! Search options threaded through every build stage.
//!
//! Options arrive as JSON from the caller. Every field is optional; absent filters are no-ops.
//! Each builder merges its fixed [`ExtraOptions`] over the caller's options before building.

use std::{collections::BTreeMap, fmt, str::FromStr};

use esq_config::VectorStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{OneOrMany, serde_as};

use crate::{
    BuildError,
    levels::Feature,
    user::{CurrentUser, Namespace},
};

/// Field holding a document's project id.
pub const PROJECT_ID_FIELD: &str = "project_id";

/// Field holding a document's project visibility level.
pub const PROJECT_VISIBILITY_FIELD: &str = "visibility_level";

/// Field holding a document's namespace ancestry.
pub const TRAVERSAL_IDS_FIELD: &str = "traversal_ids";

/// Embedding field searched before the embedding backfill finishes.
pub const DEFAULT_EMBEDDING_FIELD: &str = "embedding_0";

/// Embedding model matching [`DEFAULT_EMBEDDING_FIELD`].
pub const DEFAULT_EMBEDDING_MODEL: &str = "textembedding-gecko@003";

/// How much of the instance a search covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum SearchLevel {
    /// Every project the user can see.
    Global,
    /// One or more group hierarchies.
    Group,
    /// One or more projects.
    Project,
}

impl SearchLevel {
    /// Returns the level name used in clause names.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Group => "group",
            Self::Project => "project",
        }
    }
}

impl fmt::Display for SearchLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchLevel {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(Self::Global),
            "group" => Ok(Self::Group),
            "project" => Ok(Self::Project),
            other => Err(BuildError::InvalidSearchLevel(other.to_string())),
        }
    }
}

impl TryFrom<String> for SearchLevel {
    type Error = BuildError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SearchLevel> for String {
    fn from(level: SearchLevel) -> Self {
        level.as_str().to_string()
    }
}

/// The projects a search is limited to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "ScopeRepr", into = "ScopeRepr")]
pub enum ProjectScope {
    /// No project restriction (`"any"`).
    Any,
    /// An explicit list of project ids.
    Ids(Vec<u64>),
}

impl Default for ProjectScope {
    fn default() -> Self {
        Self::Ids(Vec::new())
    }
}

impl ProjectScope {
    /// Returns true for [`ProjectScope::Any`].
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// Returns the explicit ids, or an empty slice for [`ProjectScope::Any`].
    pub fn ids(&self) -> &[u64] {
        match self {
            Self::Any => &[],
            Self::Ids(ids) => ids,
        }
    }
}

/// Wire form of [`ProjectScope`]: the keyword `"any"` or a list of ids.
#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum ScopeRepr {
    /// A keyword; only `"any"` is accepted.
    Keyword(String),
    /// Project ids.
    Ids(Vec<u64>),
}

impl TryFrom<ScopeRepr> for ProjectScope {
    type Error = String;

    fn try_from(repr: ScopeRepr) -> Result<Self, Self::Error> {
        match repr {
            ScopeRepr::Keyword(keyword) if keyword == "any" => Ok(Self::Any),
            ScopeRepr::Keyword(other) => Err(format!("unknown project scope '{other}'")),
            ScopeRepr::Ids(ids) => Ok(Self::Ids(ids)),
        }
    }
}

impl From<ProjectScope> for ScopeRepr {
    fn from(scope: ProjectScope) -> Self {
        match scope {
            ProjectScope::Any => Self::Keyword("any".into()),
            ProjectScope::Ids(ids) => Self::Ids(ids),
        }
    }
}

/// Where the keyword clause goes in the root `bool` query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordMatchClause {
    /// The text must match.
    #[default]
    Must,
    /// The text contributes to scoring alongside other optional clauses.
    Should,
}

/// Per-document-type options merged over the caller's options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtraOptions {
    /// Document type tag.
    pub doc_type: &'static str,
    /// Features gating access to the document type.
    pub features: &'static [Feature],
    /// Default searched fields with boosts.
    pub fields: &'static [&'static str],
    /// Field holding the project id.
    pub project_id_field: &'static str,
    /// Field holding the project visibility level.
    pub project_visibility_level_field: &'static str,
    /// Field holding the namespace ancestry.
    pub traversal_ids_prefix: &'static str,
    /// Whether group searches authorize by traversal ids.
    pub authorization_use_traversal_ids: bool,
    /// Whether project permissions are denormalized into the document.
    pub no_join_project: bool,
}

/// Caller-supplied options for one search.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchOptions {
    /// The searching user; `None` for anonymous searches.
    pub current_user: Option<CurrentUser>,
    /// Global, group or project search.
    pub search_level: Option<SearchLevel>,
    /// Projects the search is limited to.
    pub project_ids: ProjectScope,
    /// Groups the search is limited to.
    pub group_ids: Vec<u64>,
    /// Pre-resolved namespaces referenced by `group_ids`.
    pub namespaces: Vec<Namespace>,
    /// Features gating the searched document type.
    #[serde_as(as = "OneOrMany<_>")]
    pub features: Vec<Feature>,
    /// Document type tag.
    pub doc_type: Option<String>,
    /// Field holding the project id.
    pub project_id_field: Option<String>,
    /// Field holding the project visibility level.
    pub project_visibility_level_field: Option<String>,
    /// Field holding the namespace ancestry.
    pub traversal_ids_prefix: Option<String>,
    /// Whether group searches authorize by traversal ids.
    pub authorization_use_traversal_ids: bool,
    /// Whether project permissions are denormalized into the document.
    pub no_join_project: bool,
    /// Whether public and internal projects are searched besides memberships.
    pub public_and_internal_projects: bool,
    /// Searched fields, overriding the document type's defaults.
    pub fields: Vec<String>,
    /// Ids of documents related to the query text (for example through notes).
    pub related_ids: Vec<u64>,
    /// Boost of the related-ids clause.
    pub related_ids_boost: Option<f64>,
    /// Placement of the keyword clause.
    pub keyword_match_clause: KeywordMatchClause,
    /// Boost applied to the simple query string clause.
    pub simple_query_string_boost: Option<f64>,
    /// Vector backend available for hybrid search.
    pub vectors_supported: VectorStore,
    /// Pre-computed query embedding.
    pub embeddings: Option<Vec<f32>>,
    /// Field holding document embeddings.
    pub embedding_field: Option<String>,
    /// Model producing query embeddings.
    pub embedding_model: Option<String>,
    /// Minimum vector similarity for nearest-neighbour hits.
    pub hybrid_similarity: Option<f64>,
    /// Boost of the nearest-neighbour clause.
    pub hybrid_boost: Option<f64>,
    /// Where the search originated (`glql` disables hybrid search).
    pub source: Option<String>,
    /// Sort field (`created_at`, `updated_at`, `popularity`).
    pub order_by: Option<String>,
    /// Sort direction, or a combined value such as `created_desc`.
    pub sort: Option<String>,
    /// One-based page number.
    pub page: Option<u64>,
    /// Hits per page.
    pub per_page: Option<u64>,
    /// Stored fields returned per hit.
    pub source_fields: Vec<String>,
    /// Only count matches.
    pub count_only: bool,
    /// Only aggregate labels.
    pub aggregation: bool,
    /// Issuable state.
    pub state: Option<String>,
    /// Whether archived projects are searched.
    pub include_archived: bool,
    /// Restrict to confidential (`true`) or public (`false`) documents.
    pub confidential: Option<bool>,
    /// Label names for the id-based label filter.
    #[serde_as(as = "OneOrMany<_>")]
    pub label_name: Vec<String>,
    /// Pre-resolved label ids per label name.
    pub label_ids_by_name: BTreeMap<String, Vec<u64>>,
    /// Labels that must all be present.
    pub label_names: Vec<String>,
    /// Labels that must be absent.
    pub not_label_names: Vec<String>,
    /// Labels of which at least one must be present.
    pub or_label_names: Vec<String>,
    /// Only unlabeled documents.
    pub none_label_names: bool,
    /// Only labeled documents.
    pub any_label_names: bool,
    /// Assignees that must all be present.
    pub assignee_ids: Vec<u64>,
    /// Assignees that must be absent.
    pub not_assignee_ids: Vec<u64>,
    /// Assignees of which at least one must be present.
    pub or_assignee_ids: Vec<u64>,
    /// Only unassigned documents.
    pub none_assignees: bool,
    /// Only assigned documents.
    pub any_assignees: bool,
    /// Work item types to include.
    pub work_item_type_ids: Vec<u64>,
    /// Work item types to exclude.
    pub not_work_item_type_ids: Vec<u64>,
    /// Milestone titles to include.
    #[serde_as(as = "OneOrMany<_>")]
    pub milestone_title: Vec<String>,
    /// Milestone titles to exclude.
    #[serde_as(as = "OneOrMany<_>")]
    pub not_milestone_title: Vec<String>,
    /// Only documents without a milestone.
    pub none_milestones: bool,
    /// Only documents with a milestone.
    pub any_milestones: bool,
    /// Author to include.
    pub author_id: Option<u64>,
    /// Author to exclude.
    pub not_author_id: Option<u64>,
    /// Source branch to include.
    pub source_branch: Option<String>,
    /// Source branch to exclude.
    pub not_source_branch: Option<String>,
    /// Target branch to include.
    pub target_branch: Option<String>,
    /// Target branch to exclude.
    pub not_target_branch: Option<String>,
    /// Predetermined ancestry paths to limit the search to.
    pub traversal_ids: Vec<String>,
    /// Noteable type for related-notes lookups.
    pub noteable_type: Option<String>,
    /// Hit count for related-notes lookups.
    pub related_size: Option<u64>,
}

impl SearchOptions {
    /// Deserializes options from a JSON document.
    pub fn from_json(value: Value) -> Result<Self, BuildError> {
        serde_json::from_value(value).map_err(|e| BuildError::InvalidOptions(e.to_string()))
    }

    /// Merges per-type options over these options.
    ///
    /// Searched fields keep the caller's override when one was given.
    pub fn apply_extra(&mut self, extra: &ExtraOptions) {
        self.doc_type = Some(extra.doc_type.to_string());
        self.features = extra.features.to_vec();
        if self.fields.is_empty() {
            self.fields = extra.fields.iter().map(ToString::to_string).collect();
        }
        self.project_id_field = Some(extra.project_id_field.to_string());
        self.project_visibility_level_field = Some(extra.project_visibility_level_field.to_string());
        self.traversal_ids_prefix = Some(extra.traversal_ids_prefix.to_string());
        self.authorization_use_traversal_ids = extra.authorization_use_traversal_ids;
        self.no_join_project = extra.no_join_project;
    }

    /// Returns the searching user.
    pub fn user(&self) -> Option<&CurrentUser> {
        self.current_user.as_ref()
    }

    /// Returns true when the user reads everything.
    pub fn can_read_all_resources(&self) -> bool {
        self.user().is_some_and(|u| u.can_read_all_resources)
    }

    /// Returns the search level, failing when absent.
    pub fn search_level(&self) -> Result<SearchLevel, BuildError> {
        self.search_level.ok_or(BuildError::MissingSearchLevel)
    }

    /// Returns the document type, failing when absent.
    pub fn doc_type(&self, requester: &'static str) -> Result<&str, BuildError> {
        self.doc_type
            .as_deref()
            .ok_or(BuildError::MissingDocType(requester))
    }

    /// Field holding the project id.
    pub fn project_id_field(&self) -> &str {
        self.project_id_field.as_deref().unwrap_or(PROJECT_ID_FIELD)
    }

    /// Field holding the project visibility level.
    pub fn visibility_level_field(&self) -> &str {
        self.project_visibility_level_field
            .as_deref()
            .unwrap_or(PROJECT_VISIBILITY_FIELD)
    }

    /// Field holding the namespace ancestry.
    pub fn traversal_ids_field(&self) -> &str {
        self.traversal_ids_prefix
            .as_deref()
            .unwrap_or(TRAVERSAL_IDS_FIELD)
    }

    /// Field holding document embeddings.
    pub fn embedding_field(&self) -> &str {
        self.embedding_field
            .as_deref()
            .unwrap_or(DEFAULT_EMBEDDING_FIELD)
    }

    /// Model producing query embeddings.
    pub fn embedding_model(&self) -> &str {
        self.embedding_model
            .as_deref()
            .unwrap_or(DEFAULT_EMBEDDING_MODEL)
    }

    /// Returns the project scope after cross-project restrictions.
    ///
    /// Users who may not read across projects get an empty scope when more than one project is
    /// requested, so read permissions are only ever checked for a single project.
    pub fn scoped_project_ids(&self) -> ProjectScope {
        match &self.project_ids {
            ProjectScope::Any => ProjectScope::Any,
            ProjectScope::Ids(ids) => {
                let cross_project = self.user().is_none_or(|u| u.can_read_cross_project);
                if !cross_project && ids.len() > 1 {
                    ProjectScope::Ids(Vec::new())
                } else {
                    ProjectScope::Ids(ids.clone())
                }
            }
        }
    }

    /// Returns the catalog entry for namespace `id`.
    pub fn namespace(&self, id: u64) -> Option<&Namespace> {
        self.namespaces.iter().find(|n| n.id == id)
    }

    /// Returns the ancestry paths of the searched groups.
    pub fn searched_group_traversal_ids(&self) -> Vec<String> {
        self.group_ids
            .iter()
            .filter_map(|id| self.namespace(*id))
            .map(|n| n.traversal_ids.clone())
            .collect()
    }
}
