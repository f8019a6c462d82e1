//! Configuration system for esq.
//!
//! esq uses TOML configuration files named `.esq.toml`. Configuration is resolved by walking up
//! the directory tree from the current working directory, collecting any `.esq.toml` files
//! found, then loading `~/.esq.toml` as the global config with lowest precedence.
//!
//! The settings describe the deployment the queries are compiled for: highlight markup, search
//! defaults, hybrid (keyword + vector) search switches, and which background data migrations
//! have completed on the target index.

#![warn(missing_docs)]

mod discovery;
mod merge;
pub mod migrations;
mod parse;
mod templates;
mod validate;

use std::path::{Path, PathBuf};

pub use discovery::{CONFIG_FILENAME, discover_config_files, global_config_path, is_global_config};
pub use merge::{ParsedConfig, merge_configs};
pub use parse::{
    ConfigError, RawConfig, RawHighlightSettings, RawHybridSettings, RawMigrationSettings,
    RawSearchSettings, parse_config_file, parse_config_str,
};
use serde::{Deserialize, Serialize};
pub use templates::{global_template, local_template};
pub use validate::{ConfigWarning, MAX_AGGREGATION_SIZE, SUPPORTED_ANALYZERS};
use validate::validate_config;

/// Top-level merged configuration for esq.
///
/// This represents the fully resolved configuration after merging all discovered `.esq.toml`
/// files according to precedence rules.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Highlight markup settings.
    pub highlight: HighlightSettings,
    /// Search defaults.
    pub search: SearchSettings,
    /// Hybrid search settings.
    pub hybrid: HybridSettings,
    /// Completed index migrations.
    pub migrations: MigrationSettings,
    /// Directory containing the most specific config file.
    pub config_root: Option<PathBuf>,
}

impl Config {
    /// Loads configuration by discovering and merging all relevant `.esq.toml` files.
    ///
    /// This is the main entry point for loading configuration. It:
    /// 1. Discovers all `.esq.toml` files from `cwd` up to the filesystem root
    /// 2. Appends `~/.esq.toml` if it exists
    /// 3. Parses each file
    /// 4. Merges them according to precedence rules (closest to `cwd` wins)
    ///
    /// Returns `Ok(Config::default())` if no configuration files are found.
    pub fn load(cwd: &Path) -> Result<Self, ConfigError> {
        let config_files = discover_config_files(cwd);
        Self::load_from_files(&config_files)
    }

    /// Loads configuration from a specific list of config file paths.
    ///
    /// Files should be provided in precedence order: highest precedence first.
    ///
    /// Returns `Ok(Config::default())` if the list is empty.
    pub fn load_from_files(files: &[PathBuf]) -> Result<Self, ConfigError> {
        if files.is_empty() {
            return Ok(Self::default());
        }

        let parsed: Vec<ParsedConfig> = files
            .iter()
            .map(|path| {
                let config = parse_config_file(path)?;
                Ok(ParsedConfig {
                    path: path.clone(),
                    config,
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;

        Ok(merge_configs(&parsed))
    }

    /// Validates the configuration and returns any warnings.
    ///
    /// This checks for:
    /// - Empty highlight tags
    /// - Out-of-range hybrid similarity and oversized aggregation buckets
    /// - Hybrid search enabled without a vector store
    /// - Unknown custom analyzers and migration names
    pub fn validate(&self) -> Vec<ConfigWarning> {
        validate_config(self)
    }

    /// Serializes the effective settings to TOML format.
    ///
    /// The output uses the same layout as a `.esq.toml` file.
    pub fn settings_to_toml(&self) -> String {
        let serializable = SerializableSettings {
            highlight: &self.highlight,
            search: &self.search,
            hybrid: &self.hybrid,
            migrations: &self.migrations,
        };
        toml::to_string_pretty(&serializable).expect("settings serialization should not fail")
    }
}

/// Markup wrapped around highlighted matches.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HighlightSettings {
    /// Inserted before each match.
    pub pre_tag: String,
    /// Inserted after each match.
    pub post_tag: String,
}

impl Default for HighlightSettings {
    fn default() -> Self {
        Self {
            pre_tag: String::from("gitlabelasticsearch→"),
            post_tag: String::from("←gitlabelasticsearch"),
        }
    }
}

/// Search defaults shared by every document type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Page size when the caller does not specify one.
    pub default_per_page: u64,
    /// Bucket count for label aggregations (capped at 500).
    pub aggregation_size: u32,
    /// Boost applied to the related-ids clause when the caller does not specify one.
    pub related_ids_boost: f64,
    /// Language analyzers whose sub-fields are searched alongside the defaults.
    pub custom_analyzers: Vec<String>,
    /// Use the refactored membership filter instead of the legacy one.
    pub refactored_membership_filter: bool,
    /// Boost related ids in global work item searches (never on SaaS).
    pub related_ids_in_global_search: bool,
    /// Whether the deployment is a multi-tenant SaaS instance.
    pub saas: bool,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_per_page: 20,
            aggregation_size: 500,
            related_ids_boost: 2.0,
            custom_analyzers: Vec::new(),
            refactored_membership_filter: true,
            related_ids_in_global_search: true,
            saas: false,
        }
    }
}

/// Vector store backing hybrid search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VectorStore {
    /// No vector support; hybrid search falls back to keyword search.
    #[default]
    None,
    /// Elasticsearch dense vectors with a top-level `knn` section.
    Elasticsearch,
    /// OpenSearch k-NN plugin with `knn` clauses inside the bool query.
    Opensearch,
}

/// Hybrid keyword + vector search settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HybridSettings {
    /// Master switch for hybrid work item search.
    pub enabled: bool,
    /// Instance-wide AI features switch.
    pub ai_global_switch: bool,
    /// Whether work item embeddings are indexed.
    pub work_item_embedding: bool,
    /// Whether AI features are purchasable on this instance.
    pub ai_available: bool,
    /// Minimum query length (in characters) for hybrid search.
    pub min_query_length: usize,
    /// Vector store of the target cluster.
    pub vectors: VectorStore,
    /// Number of nearest neighbours to return.
    pub k: u32,
    /// Candidates considered per shard.
    pub num_candidates: u32,
    /// Minimum vector similarity for a neighbour to count.
    pub similarity: f64,
    /// Boost of the vector part relative to the keyword part.
    pub boost: f64,
    /// Boost applied to keyword clauses on OpenSearch.
    pub keyword_boost: f64,
    /// Embedding requests allowed per user per minute.
    pub embedding_requests_per_minute: u32,
}

impl Default for HybridSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            ai_global_switch: true,
            work_item_embedding: false,
            ai_available: false,
            min_query_length: 10,
            vectors: VectorStore::None,
            k: 25,
            num_candidates: 100,
            similarity: 0.6,
            boost: 5.0,
            keyword_boost: 0.2,
            embedding_requests_per_minute: 450,
        }
    }
}

/// Completed background migrations on the target index.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MigrationSettings {
    /// Names of migrations that have finished.
    pub completed: Vec<String>,
}

impl MigrationSettings {
    /// Returns true when the named migration has finished.
    pub fn is_finished(&self, name: &str) -> bool {
        self.completed.iter().any(|m| m == name)
    }
}

/// Internal struct for TOML serialization of settings.
#[derive(Serialize)]
struct SerializableSettings<'a> {
    /// Highlight markup settings.
    highlight: &'a HighlightSettings,
    /// Search defaults.
    search: &'a SearchSettings,
    /// Hybrid search settings.
    hybrid: &'a HybridSettings,
    /// Completed migrations.
    migrations: &'a MigrationSettings,
}
