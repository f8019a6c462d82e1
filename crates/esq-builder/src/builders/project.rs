//! Project search.

use crate::{
    BuildEnv, filters,
    hybrid::SearchMode,
    options::{ExtraOptions, PROJECT_VISIBILITY_FIELD, SearchOptions, TRAVERSAL_IDS_FIELD},
    pipeline::{Pipeline, Stage},
};

use super::{QueryBuilder, format_stages, membership_stage};

/// Builds project searches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectQueryBuilder;

impl QueryBuilder for ProjectQueryBuilder {
    fn extra_options(&self) -> ExtraOptions {
        ExtraOptions {
            doc_type: "project",
            features: &[],
            fields: &[
                "name^10",
                "name_with_namespace^2",
                "path_with_namespace",
                "path^9",
                "description",
            ],
            project_id_field: "id",
            project_visibility_level_field: PROJECT_VISIBILITY_FIELD,
            traversal_ids_prefix: TRAVERSAL_IDS_FIELD,
            authorization_use_traversal_ids: true,
            no_join_project: true,
        }
    }

    fn prepare(&self, _query: &str, _options: &mut SearchOptions, _env: &BuildEnv<'_>) -> SearchMode {
        SearchMode::FullText
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline {
            filters: vec![
                membership_stage(),
                filter_stage!(by_archived),
                filter_stage!(by_traversal_ids),
            ],
            aggregations: Vec::new(),
            formats: format_stages(),
        }
    }
}
