//! Keyword search.

use esq_config::Config;
use esq_query::{BoolExpr, Highlight, NameScope, Occur, QueryDoc, text};
use serde_json::{Value, json};

use crate::{
    BuildEnv, BuildError,
    options::{KeywordMatchClause, SearchOptions},
};

use super::type_filter;

/// Base fields that have language-analyzed sub-fields.
const ANALYZED_FIELDS: &[&str] = &["title", "description"];

/// Keyword search over the configured fields.
///
/// Queries using advanced syntax (`+ * " - | ( ) ~ \`) go to the engine's simple query string
/// parser; everything else becomes a structured multi-match.
pub fn by_full_text(
    query: &str,
    options: &SearchOptions,
    env: &BuildEnv<'_>,
) -> Result<QueryDoc, BuildError> {
    if text::has_advanced_syntax(query) {
        by_simple_query_string(&options.fields, query, options, env)
    } else {
        by_multi_match_query(&options.fields, query, options, env)
    }
}

/// Keyword search through the engine's lenient simple query string parser.
pub fn by_simple_query_string(
    fields: &[String],
    query: &str,
    options: &SearchOptions,
    env: &BuildEnv<'_>,
) -> Result<QueryDoc, BuildError> {
    let doc_type = options.doc_type("simple query string")?;
    let scope = NameScope::root().scope(&[doc_type]);
    let searched = searched_fields(fields, options, env.config);

    let mut clause = json!({
        "simple_query_string": {
            "_name": scope.name(&["match", "search_terms"]),
            "fields": searched,
            "query": query,
            "lenient": true,
            "default_operator": "and"
        }
    });
    if let Some(boost) = options.simple_query_string_boost {
        clause["simple_query_string"]["boost"] = json!(boost);
    }

    Ok(assemble(clause, &searched, query, doc_type, options, env))
}

/// Keyword search combining an all-terms match with a phrase match.
pub fn by_multi_match_query(
    fields: &[String],
    query: &str,
    options: &SearchOptions,
    env: &BuildEnv<'_>,
) -> Result<QueryDoc, BuildError> {
    let doc_type = options.doc_type("multi-match query")?;
    let scope = NameScope::root().scope(&[doc_type]);
    let searched = searched_fields(fields, options, env.config);

    let mut matches = BoolExpr::new();
    matches.add(
        Occur::Should,
        json!({
            "multi_match": {
                "_name": scope.name(&["multi_match", "and", "search_terms"]),
                "fields": searched,
                "query": query,
                "operator": "and",
                "lenient": true
            }
        }),
    );
    matches.add(
        Occur::Should,
        json!({
            "multi_match": {
                "_name": scope.name(&["multi_match_phrase", "search_terms"]),
                "type": "phrase",
                "fields": searched,
                "query": query,
                "lenient": true
            }
        }),
    );
    let clause = matches.to_bool_query().unwrap_or(Value::Null);

    Ok(assemble(clause, &searched, query, doc_type, options, env))
}

/// Places the text clause in the root query and adds type filter and highlighting.
fn assemble(
    clause: Value,
    searched: &[String],
    query: &str,
    doc_type: &str,
    options: &SearchOptions,
    env: &BuildEnv<'_>,
) -> QueryDoc {
    let mut doc = QueryDoc::default();

    if text::is_blank(query) {
        doc.query.add(Occur::Must, json!({ "match_all": {} }));
        doc.track_scores = Some(true);
    } else {
        if !options.no_join_project {
            doc.add_filter(type_filter(doc_type));
        }
        if options.count_only {
            doc.add_filter(clause);
        } else if !options.related_ids.is_empty() {
            let boost = options
                .related_ids_boost
                .unwrap_or(env.config.search.related_ids_boost);
            doc.add_should(clause);
            doc.add_should(json!({
                "terms": {
                    "_name": NameScope::root().name(&[doc_type, "related", "ids"]),
                    "id": options.related_ids,
                    "boost": boost
                }
            }));
            doc.query.minimum_should_match = Some(1);
        } else if options.keyword_match_clause == KeywordMatchClause::Should {
            doc.add_should(clause);
            doc.query.minimum_should_match = Some(1);
        } else {
            doc.query.add(Occur::Must, clause);
        }
    }

    if !options.count_only {
        doc.highlight = Some(Highlight::new(
            searched.iter().map(|f| text::strip_boost(f)),
            &env.config.highlight.pre_tag,
            &env.config.highlight.post_tag,
        ));
    }

    doc
}

/// Returns the fields to search: boosts stripped for counts, analyzer sub-fields appended.
fn searched_fields(fields: &[String], options: &SearchOptions, config: &Config) -> Vec<String> {
    let mut searched: Vec<String> = fields
        .iter()
        .map(|f| {
            if options.count_only {
                text::strip_boost(f).to_string()
            } else {
                f.clone()
            }
        })
        .collect();

    for analyzer in &config.search.custom_analyzers {
        for base in ANALYZED_FIELDS {
            if fields.iter().any(|f| text::strip_boost(f) == *base) {
                searched.push(format!("{base}.{analyzer}"));
            }
        }
    }

    searched
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> SearchOptions {
        SearchOptions {
            doc_type: Some("my_type".into()),
            fields: vec!["iid^3".into(), "title^2".into(), "description".into()],
            ..SearchOptions::default()
        }
    }

    fn fields() -> Vec<String> {
        options().fields
    }

    fn type_term() -> Value {
        json!({ "term": { "type": { "_name": "doc:is_a:my_type", "value": "my_type" } } })
    }

    fn multi_match(fields: &[&str]) -> Value {
        json!({ "bool": {
            "should": [
                { "multi_match": { "_name": "my_type:multi_match:and:search_terms",
                    "fields": fields, "query": "foo bar", "operator": "and", "lenient": true } },
                { "multi_match": { "_name": "my_type:multi_match_phrase:search_terms",
                    "type": "phrase", "fields": fields, "query": "foo bar", "lenient": true } }
            ],
            "minimum_should_match": 1
        } })
    }

    #[test]
    fn simple_query_string_in_must() {
        let config = Config::default();
        let env = BuildEnv::new(&config);
        let doc = by_simple_query_string(&fields(), "foo bar", &options(), &env).unwrap();

        assert_eq!(
            doc.query.must,
            vec![json!({ "simple_query_string": {
                "_name": "my_type:match:search_terms",
                "fields": ["iid^3", "title^2", "description"],
                "query": "foo bar",
                "lenient": true,
                "default_operator": "and"
            } })]
        );
        assert_eq!(doc.query.filter, vec![type_term()]);
        assert!(doc.query.should.is_empty());
        assert!(doc.query.must_not.is_empty());
    }

    #[test]
    fn highlight_covers_searched_fields() {
        let config = Config::default();
        let env = BuildEnv::new(&config);
        let doc = by_multi_match_query(&fields(), "foo bar", &options(), &env).unwrap();

        assert_eq!(
            serde_json::to_value(doc.highlight.unwrap()).unwrap(),
            json!({
                "fields": { "iid": {}, "title": {}, "description": {} },
                "number_of_fragments": 0,
                "pre_tags": ["gitlabelasticsearch→"],
                "post_tags": ["←gitlabelasticsearch"]
            })
        );
    }

    #[test]
    fn highlight_covers_analyzer_sub_fields() {
        let mut config = Config::default();
        config.search.custom_analyzers = vec!["smartcn".into()];
        let env = BuildEnv::new(&config);
        let doc = by_simple_query_string(&fields(), "foo*", &options(), &env).unwrap();

        let highlighted: Vec<&String> = doc.highlight.as_ref().unwrap().fields.keys().collect();
        assert_eq!(
            highlighted,
            vec!["description", "description.smartcn", "iid", "title", "title.smartcn"]
        );
    }

    #[test]
    fn multi_match_in_must() {
        let config = Config::default();
        let env = BuildEnv::new(&config);
        let doc = by_multi_match_query(&fields(), "foo bar", &options(), &env).unwrap();

        assert_eq!(
            doc.query.must,
            vec![multi_match(&["iid^3", "title^2", "description"])]
        );
        assert_eq!(doc.query.filter, vec![type_term()]);
    }

    #[test]
    fn custom_analyzers_add_sub_fields() {
        let mut config = Config::default();
        config.search.custom_analyzers = vec!["smartcn".into()];
        let env = BuildEnv::new(&config);
        let doc = by_multi_match_query(&fields(), "foo bar", &options(), &env).unwrap();

        assert_eq!(
            doc.query.must,
            vec![multi_match(&[
                "iid^3",
                "title^2",
                "description",
                "title.smartcn",
                "description.smartcn"
            ])]
        );
    }

    #[test]
    fn blank_query_matches_all() {
        let config = Config::default();
        let env = BuildEnv::new(&config);
        let doc = by_multi_match_query(&fields(), "  ", &options(), &env).unwrap();

        assert_eq!(doc.query.must, vec![json!({ "match_all": {} })]);
        assert!(doc.query.filter.is_empty());
        assert_eq!(doc.track_scores, Some(true));
    }

    #[test]
    fn should_clause_moves_text_to_should() {
        let config = Config::default();
        let env = BuildEnv::new(&config);
        let options = SearchOptions {
            keyword_match_clause: KeywordMatchClause::Should,
            ..options()
        };
        let doc = by_multi_match_query(&fields(), "foo bar", &options, &env).unwrap();

        assert!(doc.query.must.is_empty());
        assert_eq!(
            doc.query.should,
            vec![multi_match(&["iid^3", "title^2", "description"])]
        );
        assert_eq!(doc.query.filter, vec![type_term()]);
        assert_eq!(doc.query.minimum_should_match, Some(1));
    }

    #[test]
    fn related_ids_join_the_text_clause() {
        let config = Config::default();
        let env = BuildEnv::new(&config);
        let options = SearchOptions {
            related_ids: vec![12, 14],
            related_ids_boost: Some(12.0),
            ..options()
        };
        let doc = by_multi_match_query(&fields(), "foo bar", &options, &env).unwrap();

        assert!(doc.query.must.is_empty());
        assert_eq!(
            doc.query.should,
            vec![
                multi_match(&["iid^3", "title^2", "description"]),
                json!({ "terms": { "_name": "my_type:related:ids", "id": [12, 14], "boost": 12.0 } })
            ]
        );
    }

    #[test]
    fn related_ids_default_boost_comes_from_config() {
        let mut config = Config::default();
        config.search.related_ids_boost = 3.5;
        let env = BuildEnv::new(&config);
        let options = SearchOptions {
            related_ids: vec![1],
            ..options()
        };
        let doc = by_simple_query_string(&fields(), "foo", &options, &env).unwrap();
        assert_eq!(doc.query.should[1]["terms"]["boost"], json!(3.5));
    }

    #[test]
    fn count_only_strips_boosts_and_filters() {
        let config = Config::default();
        let env = BuildEnv::new(&config);
        let options = SearchOptions {
            count_only: true,
            ..options()
        };
        let doc = by_multi_match_query(&fields(), "foo bar", &options, &env).unwrap();

        assert!(doc.query.must.is_empty());
        assert!(doc.query.should.is_empty());
        assert_eq!(
            doc.query.filter,
            vec![type_term(), multi_match(&["iid", "title", "description"])]
        );
        assert!(doc.highlight.is_none());
    }

    #[test]
    fn simple_query_string_boost() {
        let config = Config::default();
        let env = BuildEnv::new(&config);
        let options = SearchOptions {
            simple_query_string_boost: Some(0.2),
            ..options()
        };
        let doc = by_simple_query_string(&fields(), "foo*", &options, &env).unwrap();
        assert_eq!(doc.query.must[0]["simple_query_string"]["boost"], json!(0.2));
    }

    #[test]
    fn dispatch_by_syntax() {
        let config = Config::default();
        let env = BuildEnv::new(&config);

        let doc = by_full_text("foo bar", &options(), &env).unwrap();
        assert!(doc.query.must[0].get("bool").is_some());

        let doc = by_full_text("foo-bar", &options(), &env).unwrap();
        assert!(doc.query.must[0].get("simple_query_string").is_some());

        let doc = by_full_text("foo OR bar", &options(), &env).unwrap();
        assert!(doc.query.must[0].get("bool").is_some());
    }

    #[test]
    fn missing_doc_type_is_an_error() {
        let config = Config::default();
        let env = BuildEnv::new(&config);
        let options = SearchOptions::default();
        assert!(matches!(
            by_full_text("foo", &options, &env),
            Err(BuildError::MissingDocType(_))
        ));
    }
}
