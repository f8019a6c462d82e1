//! Merge request search.

use crate::{
    filters,
    levels::Feature,
    options::{ExtraOptions, PROJECT_VISIBILITY_FIELD, TRAVERSAL_IDS_FIELD},
    pipeline::{Pipeline, Stage},
};

use super::{ISSUABLE_FIELDS, QueryBuilder, format_stages, membership_stage};

/// Builds merge request searches.
///
/// Merge requests are indexed under their target project.
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeRequestQueryBuilder;

impl QueryBuilder for MergeRequestQueryBuilder {
    fn extra_options(&self) -> ExtraOptions {
        ExtraOptions {
            doc_type: "merge_request",
            features: &[Feature::MergeRequests],
            fields: ISSUABLE_FIELDS,
            project_id_field: "target_project_id",
            project_visibility_level_field: PROJECT_VISIBILITY_FIELD,
            traversal_ids_prefix: TRAVERSAL_IDS_FIELD,
            authorization_use_traversal_ids: true,
            no_join_project: true,
        }
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline {
            filters: vec![
                membership_stage(),
                filter_stage!(by_state),
                filter_stage!(by_not_hidden),
                filter_stage!(by_archived),
                filter_stage!(by_source_branch),
                filter_stage!(by_target_branch),
                filter_stage!(by_author),
                filter_stage!(by_label_names),
            ],
            aggregations: Vec::new(),
            formats: format_stages(),
        }
    }
}

#[cfg(test)]
mod tests {
    use esq_config::Config;
    use serde_json::{Value, json};

    use super::*;
    use crate::{BuildEnv, options::SearchOptions};

    fn build(query: &str, options: Value) -> Value {
        let config = Config::default();
        let env = BuildEnv::new(&config);
        let options = SearchOptions::from_json(options).unwrap();
        MergeRequestQueryBuilder
            .build(query, options, &env)
            .unwrap()
            .to_json()
    }

    #[test]
    fn project_level_search_uses_target_project() {
        let doc = build(
            "fix",
            json!({ "search_level": "project", "project_ids": [3], "state": "merged" }),
        );
        let filters = &doc["query"]["bool"]["filter"];
        assert!(filters.as_array().unwrap().contains(&json!({
            "terms": { "_name": "filters:level:project", "project_id": [3] }
        })));
        let rendered = filters.to_string();
        assert!(rendered.contains("filters:state"));
        assert!(!rendered.contains("filters:non_archived"));
    }

    #[test]
    fn branch_and_author_filters() {
        let doc = build(
            "fix",
            json!({
                "search_level": "global",
                "source_branch": "feature",
                "not_target_branch": "main",
                "author_id": 9
            }),
        );
        let rendered = doc["query"]["bool"]["filter"].to_string();
        for name in ["filters:source_branch", "filters:not_target_branch", "filters:author"] {
            assert!(rendered.contains(name), "missing {name}");
        }
    }

    #[test]
    fn aggregation_is_not_supported() {
        let doc = build("fix", json!({ "search_level": "global", "aggregation": true }));
        assert!(doc.get("aggs").is_none());
        assert_eq!(doc["size"], json!(20));
    }
}
