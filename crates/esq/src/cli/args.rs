//! Clap argument definitions for the `esq` CLI.

use clap::{Args, Parser, Subcommand};
use esq_builder::DocumentType;

/// Parses a document type name.
fn parse_doc_type(s: &str) -> Result<DocumentType, String> {
    s.parse::<DocumentType>().map_err(|e| e.to_string())
}

/// Top-level CLI options.
#[derive(Parser)]
#[command(name = "esq")]
#[command(about = "Build GitLab search requests for Elasticsearch and OpenSearch")]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Supported `esq` subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Build the search request for a document type
    Build(BuildCommand),

    /// Map a raw search response to record ids, highlights and a next-page cursor
    Map(MapCommand),

    /// Initialize esq configuration in the current directory
    Init(InitCommand),

    /// Validate configuration and diagnose issues
    Check,

    /// Show effective configuration settings
    Config,
}

/// Arguments for `esq build`.
#[derive(Args, Debug, Clone)]
pub struct BuildCommand {
    /// Document type: issue, merge_request, milestone, project, work_item
    #[arg(value_parser = parse_doc_type)]
    pub doc_type: DocumentType,

    /// Search query
    #[arg(default_value = "")]
    pub query: String,

    /// Search options as JSON, or @FILE to read them from a file
    #[arg(short = 'o', long, default_value = "{}")]
    pub options: String,

    /// Show the search mode and the stages that ran instead of the request
    #[arg(long)]
    pub explain: bool,

    /// Print the request on one line, without colors
    #[arg(long)]
    pub compact: bool,

    /// Query embedding as a JSON array of numbers, enabling hybrid search
    #[arg(long)]
    pub embedding: Option<String>,

    #[command(flatten)]
    /// Keyset pagination flags.
    pub page: PageArgs,
}

/// Keyset pagination flags.
#[derive(Args, Debug, Clone, Default)]
pub struct PageArgs {
    /// Request the first N hits
    #[arg(long, conflicts_with = "last")]
    pub first: Option<u64>,

    /// Request the last N hits
    #[arg(long)]
    pub last: Option<u64>,

    /// Start after this cursor, a JSON array `[sort_value, tie_breaker]`
    #[arg(long, requires = "first")]
    pub after: Option<String>,

    /// End before this cursor, a JSON array `[sort_value, tie_breaker]`
    #[arg(long, requires = "last")]
    pub before: Option<String>,
}

/// Arguments for `esq map`.
#[derive(Args, Debug, Clone)]
pub struct MapCommand {
    /// Response JSON file, or `-` for stdin
    #[arg(default_value = "-")]
    pub response: String,

    /// `_source` field holding the record id
    #[arg(long, default_value = "id")]
    pub primary_key: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `esq init`.
#[derive(Args, Debug, Clone)]
pub struct InitCommand {
    /// Create global ~/.esq.toml instead
    #[arg(long)]
    pub global: bool,

    /// Overwrite existing configuration file
    #[arg(long)]
    pub force: bool,
}
