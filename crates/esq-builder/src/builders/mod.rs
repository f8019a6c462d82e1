//! Per-document-type query builders.
//!
//! Each builder is a fixed pipeline: a base query (IID lookup, keyword or hybrid search),
//! authorization and attribute filters, then either a label aggregation or the response
//! formats and sort.

/// Wraps a filter taking only the options as a named stage.
macro_rules! filter_stage {
    ($filter:ident) => {
        Stage::new(stringify!($filter), |doc, ctx| filters::$filter(doc, ctx.options))
    };
}

mod issue;
mod merge_request;
mod milestone;
mod project;
mod work_item;

use std::{fmt, str::FromStr};

use esq_query::QueryDoc;
use tracing::debug;

use crate::{
    BuildEnv, BuildError, aggregations, filters, formats,
    hybrid::SearchMode,
    options::{ExtraOptions, SearchOptions},
    pipeline::{BuildContext, Pipeline, Stage, StageTrace},
    queries, sorts,
};

pub use self::{
    issue::IssueQueryBuilder, merge_request::MergeRequestQueryBuilder,
    milestone::MilestoneQueryBuilder, project::ProjectQueryBuilder,
    work_item::WorkItemQueryBuilder,
};

/// Searched fields shared by issuable document types.
const ISSUABLE_FIELDS: &[&str] = &["iid^3", "title^2", "description"];

/// Builds the search request of one document type.
pub trait QueryBuilder {
    /// Returns the per-type options merged over the caller's options.
    fn extra_options(&self) -> ExtraOptions;

    /// Returns the stages applied after the base query.
    fn pipeline(&self) -> Pipeline;

    /// Finalizes options and decides the search mode.
    ///
    /// Runs once per build, before any stage.
    fn prepare(&self, query: &str, _options: &mut SearchOptions, _env: &BuildEnv<'_>) -> SearchMode {
        SearchMode::detect(query)
    }

    /// Builds the text-matching part of the request.
    fn base_query(&self, ctx: &BuildContext<'_>) -> Result<QueryDoc, BuildError> {
        match ctx.mode {
            SearchMode::Iid(iid) => Ok(queries::by_iid(iid, ctx.options.doc_type("iid query")?)),
            SearchMode::FullText => queries::by_full_text(ctx.query, ctx.options, ctx.env),
            SearchMode::Hybrid => queries::by_knn(ctx.query, ctx.options, ctx.env),
        }
    }

    /// Returns the caller's options with the per-type options merged in.
    fn options(&self, options: SearchOptions) -> SearchOptions {
        let mut options = options;
        options.apply_extra(&self.extra_options());
        options
    }

    /// Builds the complete search request for `query`.
    fn build(
        &self,
        query: &str,
        options: SearchOptions,
        env: &BuildEnv<'_>,
    ) -> Result<QueryDoc, BuildError> {
        let mut options = self.options(options);
        let mode = self.prepare(query, &mut options, env);
        debug!(
            doc_type = self.extra_options().doc_type,
            mode = mode.as_str(),
            "building search request"
        );

        let ctx = BuildContext {
            query,
            options: &options,
            env,
            mode,
        };
        let doc = self.base_query(&ctx)?;
        self.pipeline().run(doc, &ctx)
    }

    /// Builds like [`QueryBuilder::build`], also reporting the mode and every stage's effect.
    fn explain(
        &self,
        query: &str,
        options: SearchOptions,
        env: &BuildEnv<'_>,
    ) -> Result<Explanation, BuildError> {
        let mut options = self.options(options);
        let mode = self.prepare(query, &mut options, env);
        let ctx = BuildContext {
            query,
            options: &options,
            env,
            mode,
        };
        let doc = self.base_query(&ctx)?;
        let (doc, stages) = self.pipeline().trace(doc, &ctx)?;
        Ok(Explanation { mode, doc, stages })
    }
}

/// A build together with how it was produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Explanation {
    /// The search mode chosen for the build.
    pub mode: SearchMode,
    /// The built request.
    pub doc: QueryDoc,
    /// Stages in the order they ran.
    pub stages: Vec<StageTrace>,
}

/// Document types with a query builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentType {
    /// Issues.
    Issue,
    /// Merge requests.
    MergeRequest,
    /// Milestones.
    Milestone,
    /// Projects.
    Project,
    /// Work items.
    WorkItem,
}

impl DocumentType {
    /// Every document type, in display order.
    pub const ALL: [Self; 5] = [
        Self::Issue,
        Self::MergeRequest,
        Self::Milestone,
        Self::Project,
        Self::WorkItem,
    ];

    /// Returns the document type tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Issue => "issue",
            Self::MergeRequest => "merge_request",
            Self::Milestone => "milestone",
            Self::Project => "project",
            Self::WorkItem => "work_item",
        }
    }

    /// Returns the builder for this type.
    pub fn builder(self) -> &'static dyn QueryBuilder {
        match self {
            Self::Issue => &IssueQueryBuilder,
            Self::MergeRequest => &MergeRequestQueryBuilder,
            Self::Milestone => &MilestoneQueryBuilder,
            Self::Project => &ProjectQueryBuilder,
            Self::WorkItem => &WorkItemQueryBuilder,
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BuildError::UnknownDocType(s.to_string()))
    }
}

/// Authorization by search level and membership, using the configured strategy.
fn membership_stage() -> Stage {
    Stage::new("by_search_level_and_membership", |doc, ctx| {
        let strategy = filters::MembershipFilter::from_config(ctx.config());
        filters::by_search_level_and_membership(doc, ctx.options, strategy)
    })
}

/// Label facet request replacing the formats.
fn label_aggregation_stages() -> Vec<Stage> {
    vec![Stage::new("aggregations::by_label_ids", |doc, ctx| {
        Ok(aggregations::by_label_ids(doc, ctx.config()))
    })]
}

/// Returned fields, page size, offset and sort.
fn format_stages() -> Vec<Stage> {
    vec![
        Stage::new("formats::source_fields", |doc, ctx| {
            Ok(formats::source_fields(doc, ctx.options))
        }),
        Stage::new("formats::size", |doc, ctx| {
            Ok(formats::size(doc, ctx.options, ctx.config()))
        }),
        Stage::new("formats::page", |doc, ctx| {
            Ok(formats::page(doc, ctx.options, ctx.config()))
        }),
        Stage::new("sorts::sort_by", |doc, ctx| Ok(sorts::sort_by(doc, ctx.options))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_types_round_trip_through_names() {
        for doc_type in DocumentType::ALL {
            assert_eq!(doc_type.as_str().parse::<DocumentType>(), Ok(doc_type));
            assert_eq!(doc_type.builder().extra_options().doc_type, doc_type.as_str());
        }
        assert_eq!(
            "snippet".parse::<DocumentType>(),
            Err(BuildError::UnknownDocType("snippet".into()))
        );
    }

    #[test]
    fn explain_matches_build() {
        let config = esq_config::Config::default();
        let env = BuildEnv::new(&config);
        let options = SearchOptions::from_json(serde_json::json!({ "search_level": "global" }))
            .unwrap();
        let builder = DocumentType::Issue.builder();
        let explanation = builder.explain("#12", options.clone(), &env).unwrap();
        assert_eq!(explanation.mode, SearchMode::Iid(12));
        assert_eq!(explanation.doc, builder.build("#12", options, &env).unwrap());
        assert_eq!(explanation.stages[0].name, "by_search_level_and_membership");
        assert_eq!(
            explanation.stages.last().map(|s| s.name),
            Some("sorts::sort_by")
        );
    }

    #[test]
    fn format_stages_run_last_in_order() {
        let names: Vec<&str> = format_stages().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec!["formats::source_fields", "formats::size", "formats::page", "sorts::sort_by"]
        );
    }
}
