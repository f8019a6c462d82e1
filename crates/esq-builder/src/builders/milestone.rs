//! Milestone search.

use crate::{
    BuildEnv, filters,
    hybrid::SearchMode,
    levels::Feature,
    options::{
        ExtraOptions, PROJECT_ID_FIELD, PROJECT_VISIBILITY_FIELD, SearchOptions, TRAVERSAL_IDS_FIELD,
    },
    pipeline::{Pipeline, Stage},
};

use super::{QueryBuilder, format_stages};

/// Builds milestone searches.
///
/// Milestones are readable through either issues or merge requests, and are still authorized
/// by project ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilestoneQueryBuilder;

impl QueryBuilder for MilestoneQueryBuilder {
    fn extra_options(&self) -> ExtraOptions {
        ExtraOptions {
            doc_type: "milestone",
            features: &[Feature::Issues, Feature::MergeRequests],
            fields: &["title^2", "description"],
            project_id_field: PROJECT_ID_FIELD,
            project_visibility_level_field: PROJECT_VISIBILITY_FIELD,
            traversal_ids_prefix: TRAVERSAL_IDS_FIELD,
            authorization_use_traversal_ids: false,
            no_join_project: true,
        }
    }

    /// Milestones have no `#` references, so every query is a keyword search.
    fn prepare(&self, _query: &str, _options: &mut SearchOptions, _env: &BuildEnv<'_>) -> SearchMode {
        SearchMode::FullText
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline {
            filters: vec![
                filter_stage!(by_project_authorization),
                filter_stage!(by_archived),
            ],
            aggregations: Vec::new(),
            formats: format_stages(),
        }
    }
}
