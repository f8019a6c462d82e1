//! Implementation of `esq build`.

use std::{fs, process::ExitCode};

use esq_builder::{
    BuildEnv, Cursor, Explanation, Pagination, RateLimiter, SearchOptions, StaticEmbedding,
};
use esq_query::QueryDoc;
use serde_json::Value;
use tracing::debug;

use crate::cli::{
    args::{BuildCommand, PageArgs},
    context::CommandContext,
    output::{header, print_json, stage_table},
};

/// Builds the search request for a document type and prints it.
pub fn run(ctx: &CommandContext, cmd: &BuildCommand) -> ExitCode {
    let options = match read_options(&cmd.options) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let service = match cmd.embedding.as_deref().map(parse_embedding).transpose() {
        Ok(embedding) => embedding.map(StaticEmbedding::new),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let limiter = RateLimiter::per_minute(ctx.config.hybrid.embedding_requests_per_minute);
    let env = match &service {
        Some(service) => BuildEnv::new(&ctx.config).with_embeddings(service, &limiter),
        None => BuildEnv::new(&ctx.config),
    };

    let builder = cmd.doc_type.builder();
    if cmd.explain {
        return match builder.explain(&cmd.query, options, &env) {
            Ok(explanation) => print_explanation(&explanation),
            Err(e) => {
                eprintln!("error: {e}");
                ExitCode::FAILURE
            }
        };
    }

    let doc = match builder
        .build(&cmd.query, options, &env)
        .map_err(|e| e.to_string())
        .and_then(|doc| paginate(doc, &cmd.page))
    {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    print_json(&doc.to_json(), cmd.compact)
}

/// Reads search options from inline JSON or from `@FILE`.
fn read_options(raw: &str) -> Result<SearchOptions, String> {
    let text = match raw.strip_prefix('@') {
        Some(path) => {
            debug!(path, "reading options file");
            fs::read_to_string(path).map_err(|e| format!("failed to read {path}: {e}"))?
        }
        None => raw.to_string(),
    };
    let value: Value =
        serde_json::from_str(&text).map_err(|e| format!("options are not valid JSON: {e}"))?;
    SearchOptions::from_json(value).map_err(|e| e.to_string())
}

/// Parses a query embedding given as a JSON array.
fn parse_embedding(raw: &str) -> Result<Vec<f32>, String> {
    serde_json::from_str(raw).map_err(|e| format!("embedding must be a JSON array of numbers: {e}"))
}

/// Parses a cursor given as `[sort_value, tie_breaker]`.
fn parse_cursor(raw: Option<&str>) -> Result<Option<Cursor>, String> {
    raw.map(|raw| {
        serde_json::from_str(raw)
            .map_err(|e| format!("cursor must be a JSON array [sort_value, tie_breaker]: {e}"))
    })
    .transpose()
}

/// Applies the keyset pagination flags.
fn paginate(doc: QueryDoc, page: &PageArgs) -> Result<QueryDoc, String> {
    let (size, first) = match (page.first, page.last) {
        (Some(size), _) => (size, true),
        (None, Some(size)) => (size, false),
        (None, None) => return Ok(doc),
    };
    let pagination = Pagination::new(doc).map_err(|e| e.to_string())?;
    Ok(if first {
        pagination.first(size, parse_cursor(page.after.as_deref())?.as_ref())
    } else {
        pagination.last(size, parse_cursor(page.before.as_deref())?.as_ref())
    })
}

/// Prints the search mode and the stage table.
fn print_explanation(explanation: &Explanation) -> ExitCode {
    println!("{} {}", header("Mode:"), explanation.mode.as_str());
    println!();
    println!("{}", stage_table(&explanation.stages));
    ExitCode::SUCCESS
}
