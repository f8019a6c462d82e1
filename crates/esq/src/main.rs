//! Command-line interface for esq.
//!
//! Builds Elasticsearch/OpenSearch request bodies for GitLab document types from a query and a
//! JSON options document, and maps raw search responses back to record ids.

mod cli;

use std::{io, process::ExitCode};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    CommandContext,
    args::{Cli, Commands},
    commands,
};

/// Environment variable holding the log filter.
const LOG_ENV: &str = "ESQ_LOG";

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let ctx = match cli.command {
        Commands::Init(_) => CommandContext::load_cwd_only(),
        _ => CommandContext::load(),
    };
    match ctx {
        Ok(ctx) => commands::run(cli.command, &ctx),
        Err(code) => code,
    }
}

/// Logs to stderr, filtered by `ESQ_LOG` (warnings only by default).
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
