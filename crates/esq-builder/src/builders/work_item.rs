//! Work item search.
//!
//! Work items are the only document type with hybrid keyword + vector search. Whether a build
//! is hybrid is decided once in [`QueryBuilder::prepare`]: the query embedding is fetched there,
//! and a failure downgrades the whole build to keyword search.

use esq_config::migrations;
use tracing::{debug, warn};

use crate::{
    BuildEnv, filters,
    hybrid::{SearchMode, query_embedding, vector_store},
    levels::Feature,
    options::{ExtraOptions, PROJECT_ID_FIELD, SearchLevel, SearchOptions},
    pipeline::{Pipeline, Stage},
};

use super::{ISSUABLE_FIELDS, QueryBuilder, format_stages, label_aggregation_stages, membership_stage};

/// Embedding field populated by the second embedding backfill.
const BACKFILLED_EMBEDDING_FIELD: &str = "embedding_1";

/// Model producing embeddings for [`BACKFILLED_EMBEDDING_FIELD`].
const BACKFILLED_EMBEDDING_MODEL: &str = "text-embedding-005";

/// Builds work item searches.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkItemQueryBuilder;

impl QueryBuilder for WorkItemQueryBuilder {
    fn extra_options(&self) -> ExtraOptions {
        ExtraOptions {
            doc_type: "work_item",
            features: &[Feature::Issues],
            fields: ISSUABLE_FIELDS,
            project_id_field: PROJECT_ID_FIELD,
            project_visibility_level_field: "project_visibility_level",
            traversal_ids_prefix: "traversal_ids",
            authorization_use_traversal_ids: true,
            no_join_project: true,
        }
    }

    fn prepare(&self, query: &str, options: &mut SearchOptions, env: &BuildEnv<'_>) -> SearchMode {
        let config = env.config;

        if options.search_level == Some(SearchLevel::Global)
            && (!config.search.related_ids_in_global_search || config.search.saas)
        {
            options.related_ids.clear();
        }

        if options.embedding_field.is_none()
            && config
                .migrations
                .is_finished(migrations::BACKFILL_WORK_ITEM_EMBEDDINGS_1)
        {
            options.embedding_field = Some(BACKFILLED_EMBEDDING_FIELD.to_string());
            options.embedding_model = Some(BACKFILLED_EMBEDDING_MODEL.to_string());
        }

        let mode = SearchMode::detect_hybrid(query, options, config);
        if mode != SearchMode::Hybrid {
            return mode;
        }

        match query_embedding(query, options, env) {
            Ok(embedding) => {
                debug!(dimensions = embedding.len(), "hybrid search");
                options.vectors_supported = vector_store(options, config);
                options.embeddings = Some(embedding);
                SearchMode::Hybrid
            }
            Err(error) => {
                warn!(%error, "query embedding unavailable, using keyword search");
                SearchMode::FullText
            }
        }
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline {
            filters: vec![
                membership_stage(),
                filter_stage!(by_confidentiality),
                filter_stage!(by_not_hidden),
                filter_stage!(by_state),
                filter_stage!(by_archived),
                filter_stage!(by_work_item_type_ids),
                filter_stage!(by_author),
                filter_stage!(by_assignees),
                Stage::new("by_milestone", |doc, ctx| {
                    if ctx
                        .config()
                        .migrations
                        .is_finished(migrations::BACKFILL_WORK_ITEM_MILESTONE_DATA)
                    {
                        filters::by_milestone(doc, ctx.options)
                    } else {
                        Ok(doc)
                    }
                }),
                Stage::new("by_label_names", |doc, ctx| {
                    if ctx
                        .config()
                        .migrations
                        .is_finished(migrations::ADD_EXTRA_FIELDS_TO_WORK_ITEMS)
                    {
                        filters::by_label_names(doc, ctx.options)
                    } else {
                        Ok(doc)
                    }
                }),
                filter_stage!(by_knn),
            ],
            aggregations: label_aggregation_stages(),
            formats: format_stages(),
        }
    }
}

#[cfg(test)]
mod tests {
    use esq_config::{Config, VectorStore};
    use serde_json::{Value, json};

    use super::*;
    use crate::{RateLimiter, StaticEmbedding};

    fn options(value: Value) -> SearchOptions {
        WorkItemQueryBuilder.options(SearchOptions::from_json(value).unwrap())
    }

    fn global_with_related_ids() -> SearchOptions {
        options(json!({ "search_level": "global", "related_ids": [5, 6] }))
    }

    fn hybrid_config() -> Config {
        let mut config = Config::default();
        config.hybrid.enabled = true;
        config.hybrid.ai_global_switch = true;
        config.hybrid.work_item_embedding = true;
        config.hybrid.ai_available = true;
        config.hybrid.vectors = VectorStore::Opensearch;
        config
    }

    fn hybrid_options() -> SearchOptions {
        options(json!({
            "search_level": "global",
            "project_ids": "any",
            "current_user": { "id": 3, "any_group_with_ai_available": true }
        }))
    }

    #[test]
    fn embedding_field_follows_the_backfill() {
        let config = Config::default();
        let mut opts = options(json!({ "search_level": "global" }));
        WorkItemQueryBuilder.prepare("login", &mut opts, &BuildEnv::new(&config));
        assert_eq!(opts.embedding_field, None);

        let mut migrated = Config::default();
        migrated.migrations.completed = vec![migrations::BACKFILL_WORK_ITEM_EMBEDDINGS_1.into()];
        let mut opts = options(json!({ "search_level": "global" }));
        WorkItemQueryBuilder.prepare("login", &mut opts, &BuildEnv::new(&migrated));
        assert_eq!(opts.embedding_field(), BACKFILLED_EMBEDDING_FIELD);
        assert_eq!(opts.embedding_model(), BACKFILLED_EMBEDDING_MODEL);
    }

    #[test]
    fn caller_embedding_field_is_kept_after_the_backfill() {
        let mut migrated = Config::default();
        migrated.migrations.completed = vec![migrations::BACKFILL_WORK_ITEM_EMBEDDINGS_1.into()];
        let mut opts = options(json!({ "search_level": "global", "embedding_field": "embedding_0" }));
        WorkItemQueryBuilder.prepare("login", &mut opts, &BuildEnv::new(&migrated));
        assert_eq!(opts.embedding_field(), "embedding_0");
    }

    #[test]
    fn related_ids_are_kept_for_global_search_by_default() {
        let config = Config::default();
        let mut opts = global_with_related_ids();
        WorkItemQueryBuilder.prepare("login", &mut opts, &BuildEnv::new(&config));
        assert_eq!(opts.related_ids, vec![5, 6]);
    }

    #[test]
    fn related_ids_are_cleared_for_global_search_on_saas() {
        let mut saas = Config::default();
        saas.search.saas = true;
        let mut opts = global_with_related_ids();
        WorkItemQueryBuilder.prepare("login", &mut opts, &BuildEnv::new(&saas));
        assert!(opts.related_ids.is_empty());

        let mut disabled = Config::default();
        disabled.search.related_ids_in_global_search = false;
        let mut opts = global_with_related_ids();
        WorkItemQueryBuilder.prepare("login", &mut opts, &BuildEnv::new(&disabled));
        assert!(opts.related_ids.is_empty());
    }

    #[test]
    fn related_ids_are_kept_below_global_level_on_saas() {
        let mut saas = Config::default();
        saas.search.saas = true;
        let mut opts = options(json!({
            "search_level": "project",
            "project_ids": [1],
            "related_ids": [5]
        }));
        WorkItemQueryBuilder.prepare("login", &mut opts, &BuildEnv::new(&saas));
        assert_eq!(opts.related_ids, vec![5]);
    }

    #[test]
    fn hybrid_prepare_records_embedding_and_vector_store() {
        let config = hybrid_config();
        let service = StaticEmbedding::new(vec![0.25]);
        let limiter = RateLimiter::per_minute(10);
        let env = BuildEnv::new(&config).with_embeddings(&service, &limiter);
        let mut opts = hybrid_options();

        let mode = WorkItemQueryBuilder.prepare("login page crashes", &mut opts, &env);
        assert_eq!(mode, SearchMode::Hybrid);
        assert_eq!(opts.embeddings, Some(vec![0.25]));
        assert_eq!(opts.vectors_supported, VectorStore::Opensearch);
    }

    #[test]
    fn failed_embedding_demotes_to_keyword_search() {
        let config = hybrid_config();
        let service = StaticEmbedding::new(Vec::new());
        let limiter = RateLimiter::per_minute(10);
        let env = BuildEnv::new(&config).with_embeddings(&service, &limiter);
        let mut opts = hybrid_options();

        let mode = WorkItemQueryBuilder.prepare("login page crashes", &mut opts, &env);
        assert_eq!(mode, SearchMode::FullText);
        assert_eq!(opts.embeddings, None);
    }

    #[test]
    fn milestone_and_label_stages_wait_for_their_migrations() {
        let value = json!({
            "search_level": "global",
            "milestone_title": "v1.0",
            "label_names": ["bug"]
        });
        let build = |config: &Config| {
            let opts = SearchOptions::from_json(value.clone()).unwrap();
            WorkItemQueryBuilder
                .build("login", opts, &BuildEnv::new(config))
                .unwrap()
                .to_json()
                .to_string()
        };

        let rendered = build(&Config::default());
        assert!(!rendered.contains("filters:milestone_title"));
        assert!(!rendered.contains("filters:label_names"));

        let mut milestones = Config::default();
        milestones.migrations.completed =
            vec![migrations::BACKFILL_WORK_ITEM_MILESTONE_DATA.into()];
        let rendered = build(&milestones);
        assert!(rendered.contains("filters:milestone_title"));
        assert!(!rendered.contains("filters:label_names"));

        let mut labels = Config::default();
        labels.migrations.completed = vec![migrations::ADD_EXTRA_FIELDS_TO_WORK_ITEMS.into()];
        let rendered = build(&labels);
        assert!(!rendered.contains("filters:milestone_title"));
        assert!(rendered.contains("filters:label_names"));
    }
}
