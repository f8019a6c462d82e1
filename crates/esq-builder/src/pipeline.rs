//! The staged build driver.
//!
//! A build is a fold over named stages: filters first, then either the aggregation stages
//! (which end the build) or the format stages. Every builder declares its stages as data, so
//! the order of a build can be listed without running it.

use std::fmt;

use esq_config::Config;
use esq_query::QueryDoc;
use serde::Serialize;
use tracing::debug;

use crate::{BuildEnv, BuildError, hybrid::SearchMode, options::SearchOptions};

/// Everything a stage can read.
#[derive(Clone, Copy)]
pub struct BuildContext<'a> {
    /// The raw query string.
    pub query: &'a str,
    /// The caller's options merged with the builder's extra options.
    pub options: &'a SearchOptions,
    /// Deployment environment.
    pub env: &'a BuildEnv<'a>,
    /// Search mode decided once for this build.
    pub mode: SearchMode,
}

impl BuildContext<'_> {
    /// Effective configuration.
    pub fn config(&self) -> &Config {
        self.env.config
    }
}

/// Signature shared by every stage.
pub type StageFn = fn(QueryDoc, &BuildContext<'_>) -> Result<QueryDoc, BuildError>;

/// A named build step.
#[derive(Clone, Copy)]
pub struct Stage {
    /// Name shown in logs and `--explain` output.
    pub name: &'static str,
    /// The transformation.
    pub run: StageFn,
}

impl Stage {
    /// Creates a stage.
    pub const fn new(name: &'static str, run: StageFn) -> Self {
        Self { name, run }
    }
}

impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage").field("name", &self.name).finish()
    }
}

/// The effect of one stage on the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageTrace {
    /// Stage name.
    pub name: &'static str,
    /// Clauses appended to `query.bool.filter`.
    pub filters_added: usize,
    /// Whether the stage modified the document at all.
    pub changed: bool,
}

/// The ordered stages of one document type.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    /// Authorization and attribute filters.
    pub filters: Vec<Stage>,
    /// Stages replacing the formats when aggregation is requested.
    pub aggregations: Vec<Stage>,
    /// Source field, size, page and sort stages.
    pub formats: Vec<Stage>,
}

impl Pipeline {
    /// Returns the stages that run for `options`, in order.
    pub fn stages(&self, options: &SearchOptions) -> impl Iterator<Item = &Stage> {
        let tail = if self.short_circuits(options) {
            &self.aggregations
        } else {
            &self.formats
        };
        self.filters.iter().chain(tail)
    }

    /// Runs the stages over `doc`.
    pub fn run(&self, doc: QueryDoc, ctx: &BuildContext<'_>) -> Result<QueryDoc, BuildError> {
        if self.short_circuits(ctx.options) {
            debug!("aggregation requested, skipping formats");
        }
        self.stages(ctx.options).try_fold(doc, |doc, stage| {
            debug!(stage = stage.name, "running stage");
            (stage.run)(doc, ctx)
        })
    }

    /// Runs the stages over `doc`, recording what each one changed.
    pub fn trace(
        &self,
        doc: QueryDoc,
        ctx: &BuildContext<'_>,
    ) -> Result<(QueryDoc, Vec<StageTrace>), BuildError> {
        let mut doc = doc;
        let mut traces = Vec::new();
        for stage in self.stages(ctx.options) {
            let before = doc.clone();
            doc = (stage.run)(doc, ctx)?;
            traces.push(StageTrace {
                name: stage.name,
                filters_added: doc.filters().len().saturating_sub(before.filters().len()),
                changed: doc != before,
            });
        }
        Ok((doc, traces))
    }

    /// Returns true when the build ends with aggregations instead of formats.
    fn short_circuits(&self, options: &SearchOptions) -> bool {
        options.aggregation && !self.aggregations.is_empty()
    }
}
