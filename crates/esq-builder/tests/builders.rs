//! End-to-end builds through the public builder API.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use esq_builder::{
    BuildEnv, BuildError, DocumentType, QueryBuilder, RateLimiter, SearchOptions, StaticEmbedding,
    builders::WorkItemQueryBuilder,
};
use esq_config::{Config, VectorStore, migrations};
use serde_json::{Value, json};

fn options(value: Value) -> SearchOptions {
    SearchOptions::from_json(value).unwrap()
}

fn member_of_project_one() -> Value {
    json!({
        "search_level": "global",
        "project_ids": [1],
        "current_user": {
            "id": 7,
            "any_group_with_ai_available": true,
            "projects": [{ "id": 1, "access_level": 30 }]
        }
    })
}

fn hybrid_config(vectors: VectorStore) -> Config {
    let mut config = Config::default();
    config.hybrid.enabled = true;
    config.hybrid.ai_global_switch = true;
    config.hybrid.work_item_embedding = true;
    config.hybrid.ai_available = true;
    config.hybrid.vectors = vectors;
    config
}

fn build_work_items(query: &str, options: SearchOptions, env: &BuildEnv<'_>) -> Value {
    WorkItemQueryBuilder.build(query, options, env).unwrap().to_json()
}

#[test]
fn every_document_type_builds_a_global_search() {
    let config = Config::default();
    let env = BuildEnv::new(&config);
    for doc_type in DocumentType::ALL {
        let builder = doc_type.as_str().parse::<DocumentType>().unwrap().builder();
        let doc = builder
            .build("search term", options(json!({ "search_level": "global" })), &env)
            .unwrap()
            .to_json();
        assert!(
            doc.to_string().contains(&format!("{}:multi_match:and:search_terms", doc_type)),
            "{doc_type}: {doc}"
        );
        assert_eq!(doc["size"], json!(20), "{doc_type}");
    }
}

#[test]
fn unknown_document_types_are_rejected() {
    assert_eq!(
        "snippet".parse::<DocumentType>(),
        Err(BuildError::UnknownDocType("snippet".into()))
    );
}

#[test]
fn related_ids_boost_global_work_item_search() {
    let config = Config::default();
    let env = BuildEnv::new(&config);
    let mut value = member_of_project_one();
    value["related_ids"] = json!([1]);

    let doc = build_work_items("login", options(value.clone()), &env);
    let should = doc["query"]["bool"]["should"].as_array().unwrap();
    assert_eq!(should.len(), 2);
    assert_eq!(
        should[1],
        json!({ "terms": { "_name": "work_item:related:ids", "id": [1], "boost": 2.0 } })
    );
    assert_eq!(doc["query"]["bool"]["minimum_should_match"], json!(1));

    let mut saas = Config::default();
    saas.search.saas = true;
    let doc = build_work_items("login", options(value), &BuildEnv::new(&saas));
    assert!(!doc.to_string().contains("work_item:related:ids"));
}

#[test]
fn work_item_type_filters_are_applied() {
    let config = Config::default();
    let env = BuildEnv::new(&config);
    let mut value = member_of_project_one();
    value["not_work_item_type_ids"] = json!([8]);

    let doc = build_work_items("login", options(value), &env);
    let filters = doc["query"]["bool"]["filter"].to_string();
    assert!(filters.contains("filters:not_work_item_type_ids"));
    assert!(filters.contains("filters:not_hidden"));
    assert!(filters.contains("filters:non_archived"));
}

#[test]
fn milestone_and_label_filters_wait_for_their_migrations() {
    let mut value = member_of_project_one();
    value["milestone_title"] = json!("v1.0");
    value["label_names"] = json!(["bug"]);

    let config = Config::default();
    let doc = build_work_items("login", options(value.clone()), &BuildEnv::new(&config));
    let rendered = doc.to_string();
    assert!(!rendered.contains("filters:milestone_title"));
    assert!(!rendered.contains("filters:label_names"));

    let mut migrated = Config::default();
    migrated.migrations.completed = vec![
        migrations::BACKFILL_WORK_ITEM_MILESTONE_DATA.to_string(),
        migrations::ADD_EXTRA_FIELDS_TO_WORK_ITEMS.to_string(),
    ];
    let doc = build_work_items("login", options(value), &BuildEnv::new(&migrated));
    let rendered = doc.to_string();
    assert!(rendered.contains("filters:milestone_title"));
    assert!(rendered.contains("filters:label_names"));
}

#[test]
fn elasticsearch_hybrid_search_filters_the_knn_section() {
    let config = hybrid_config(VectorStore::Elasticsearch);
    let service = StaticEmbedding::new(vec![0.5, 0.25]);
    let limiter = RateLimiter::per_minute(10);
    let env = BuildEnv::new(&config).with_embeddings(&service, &limiter);

    let doc = build_work_items("login page crashes", options(member_of_project_one()), &env);
    let knn = &doc["knn"];
    assert_eq!(knn["field"], json!("embedding_0"));
    assert_eq!(knn["query_vector"], json!([0.5, 0.25]));
    assert_eq!(knn["filter"], doc["query"]["bool"]["filter"]);
}

#[test]
fn opensearch_hybrid_search_adds_a_knn_clause() {
    let config = hybrid_config(VectorStore::Opensearch);
    let service = StaticEmbedding::new(vec![0.5]);
    let limiter = RateLimiter::per_minute(10);
    let env = BuildEnv::new(&config).with_embeddings(&service, &limiter);

    let doc = build_work_items("login page crashes", options(member_of_project_one()), &env);
    assert!(doc.get("knn").is_none());
    let should = doc["query"]["bool"]["should"].as_array().unwrap();
    assert!(should.contains(&json!({ "knn": { "embedding_0": { "k": 25, "vector": [0.5] } } })));
}

#[test]
fn backfilled_embeddings_switch_the_vector_field() {
    let mut config = hybrid_config(VectorStore::Elasticsearch);
    config.migrations.completed = vec![migrations::BACKFILL_WORK_ITEM_EMBEDDINGS_1.to_string()];
    let service = StaticEmbedding::new(vec![1.0]);
    let limiter = RateLimiter::per_minute(10);
    let env = BuildEnv::new(&config).with_embeddings(&service, &limiter);

    let doc = build_work_items("login page crashes", options(member_of_project_one()), &env);
    assert_eq!(doc["knn"]["field"], json!("embedding_1"));
}

#[test]
fn hybrid_search_degrades_without_an_embedding_service() {
    let config = hybrid_config(VectorStore::Elasticsearch);
    let doc = build_work_items(
        "login page crashes",
        options(member_of_project_one()),
        &BuildEnv::new(&config),
    );
    assert!(doc.get("knn").is_none());
    assert!(doc.to_string().contains("work_item:multi_match:and:search_terms"));
}

#[test]
fn short_queries_stay_keyword_searches() {
    let config = hybrid_config(VectorStore::Elasticsearch);
    let service = StaticEmbedding::new(vec![1.0]);
    let limiter = RateLimiter::per_minute(10);
    let env = BuildEnv::new(&config).with_embeddings(&service, &limiter);

    let doc = build_work_items("login", options(member_of_project_one()), &env);
    assert!(doc.get("knn").is_none());
}
