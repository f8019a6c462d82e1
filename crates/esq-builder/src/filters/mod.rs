//! Composable filter stages.
//!
//! Every filter takes the document built so far plus the search options and returns the
//! document with its clauses appended to `query.bool.filter` (a few also touch `must_not`,
//! `_source`, `size` or `knn`). A filter whose option is absent returns the document unchanged.
//!
//! Clause names are rendered under the `filters` scope, for example `filters:not_hidden` or
//! `filters:permissions:group:ancestry_filter:descendants`.

mod access;
mod attributes;
mod confidentiality;
mod group_membership;
mod labels;
mod membership;
mod project_authorization;

use esq_config::Config;
use esq_query::{NameScope, QueryDoc};
use serde_json::{Value, json};

use crate::{
    BuildError,
    options::{ProjectScope, SearchLevel, SearchOptions},
};

pub use self::{
    attributes::{
        by_archived, by_assignees, by_author, by_knn, by_milestone, by_not_hidden,
        by_noteable_type, by_source_branch, by_state, by_target_branch, by_traversal_ids,
        by_type, by_work_item_type_ids,
    },
    confidentiality::{by_confidentiality, by_group_confidentiality},
    group_membership::by_search_level_and_group_membership,
    labels::{by_label_ids, by_label_names},
    membership::by_search_level_and_membership,
    project_authorization::by_project_authorization,
};

/// Strategy used to encode group and project membership.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MembershipFilter {
    /// Per-feature public/internal and private access groups.
    #[default]
    Refactored,
    /// Flat visibility-or-membership union.
    Legacy,
}

impl MembershipFilter {
    /// Returns the strategy selected by `config`.
    pub fn from_config(config: &Config) -> Self {
        if config.search.refactored_membership_filter {
            Self::Refactored
        } else {
            Self::Legacy
        }
    }
}

/// Returns the scope every filter name lives under.
pub(crate) fn filters_scope() -> NameScope {
    NameScope::root().scope(&["filters"])
}

/// Builds one `prefix` clause per ancestry path.
///
/// Documents whose traversal ids start with a path live in that namespace or below it.
pub(crate) fn ancestry_filter<S: AsRef<str>>(
    traversal_ids: &[S],
    field: &str,
    scope: &NameScope,
) -> Vec<Value> {
    let name = scope.name(&["ancestry_filter", "descendants"]);
    traversal_ids
        .iter()
        .map(|traversal_id| {
            json!({ "prefix": { field: { "_name": name, "value": traversal_id.as_ref() } } })
        })
        .collect()
}

/// Limits the search to the requested groups or projects.
///
/// Global searches are left alone. Group searches match documents below any searched group
/// known to the namespace catalog; project searches match the searched project ids.
pub(crate) fn search_level_filter(
    mut doc: QueryDoc,
    options: &SearchOptions,
) -> Result<QueryDoc, BuildError> {
    let level = options.search_level()?;
    let scope = filters_scope().scope(&["level", level.as_str()]);

    match level {
        SearchLevel::Global => {}
        SearchLevel::Group => {
            let traversal_ids = options.searched_group_traversal_ids();
            if traversal_ids.is_empty() {
                return Err(BuildError::MissingGroupIds);
            }
            doc.add_filter(json!({
                "bool": {
                    "_name": scope.to_string(),
                    "minimum_should_match": 1,
                    "should": ancestry_filter(&traversal_ids, options.traversal_ids_field(), &scope)
                }
            }));
        }
        SearchLevel::Project => match options.scoped_project_ids() {
            ProjectScope::Any => {}
            ProjectScope::Ids(ids) if ids.is_empty() => return Err(BuildError::MissingProjectIds),
            ProjectScope::Ids(ids) => {
                doc.add_filter(json!({ "terms": { "_name": scope.to_string(), "project_id": ids } }));
            }
        },
    }

    Ok(doc)
}
