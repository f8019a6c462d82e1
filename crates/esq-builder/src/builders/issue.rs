//! Issue search.

use crate::{
    filters,
    levels::Feature,
    options::{ExtraOptions, PROJECT_ID_FIELD, PROJECT_VISIBILITY_FIELD},
    pipeline::{Pipeline, Stage},
};

use super::{ISSUABLE_FIELDS, QueryBuilder, format_stages, label_aggregation_stages, membership_stage};

/// Builds issue searches.
#[derive(Debug, Clone, Copy, Default)]
pub struct IssueQueryBuilder;

impl QueryBuilder for IssueQueryBuilder {
    fn extra_options(&self) -> ExtraOptions {
        ExtraOptions {
            doc_type: "issue",
            features: &[Feature::Issues],
            fields: ISSUABLE_FIELDS,
            project_id_field: PROJECT_ID_FIELD,
            project_visibility_level_field: PROJECT_VISIBILITY_FIELD,
            traversal_ids_prefix: "namespace_ancestry_ids",
            authorization_use_traversal_ids: true,
            no_join_project: true,
        }
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline {
            filters: vec![
                membership_stage(),
                filter_stage!(by_confidentiality),
                filter_stage!(by_state),
                filter_stage!(by_not_hidden),
                filter_stage!(by_label_ids),
                filter_stage!(by_archived),
            ],
            aggregations: label_aggregation_stages(),
            formats: format_stages(),
        }
    }
}
