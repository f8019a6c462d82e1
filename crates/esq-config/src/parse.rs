//! Configuration file parsing.
//!
//! Parses individual `.esq.toml` files into intermediate `RawConfig` structures
//! that preserve the optional nature of all fields before merging.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use serde_with::{OneOrMany, serde_as};
use thiserror::Error;
use toml::de::Error as TomlError;

use crate::VectorStore;

/// A `.esq.toml` that could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists in the discovery chain but could not be read.
    #[error("cannot read esq config {path}: {source}")]
    ReadFile {
        /// Offending file.
        path: PathBuf,
        /// I/O failure.
        source: io::Error,
    },

    /// The file is not valid TOML or a setting has the wrong type.
    #[error("invalid esq config {path}: {source}")]
    ParseToml {
        /// Offending file.
        path: PathBuf,
        /// TOML failure, including the line and column.
        source: TomlError,
    },
}

impl ConfigError {
    /// Returns the file that failed to load.
    pub fn path(&self) -> &Path {
        match self {
            Self::ReadFile { path, .. } | Self::ParseToml { path, .. } => path,
        }
    }
}

/// Raw configuration as parsed directly from a TOML file.
///
/// All fields are optional to support partial configs that will be merged.
/// This mirrors the TOML schema exactly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// When true, stop discovery here - ignore parent and global configs.
    pub root: Option<bool>,
    /// Highlight markup section.
    pub highlight: Option<RawHighlightSettings>,
    /// Search defaults section.
    pub search: Option<RawSearchSettings>,
    /// Hybrid search section.
    pub hybrid: Option<RawHybridSettings>,
    /// Completed migrations section.
    pub migrations: Option<RawMigrationSettings>,
}

/// Raw highlight settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawHighlightSettings {
    /// Markup inserted before a match.
    pub pre_tag: Option<String>,
    /// Markup inserted after a match.
    pub post_tag: Option<String>,
}

/// Raw search settings.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawSearchSettings {
    /// Page size when the caller does not specify one.
    pub default_per_page: Option<u64>,
    /// Bucket count for label aggregations.
    pub aggregation_size: Option<u32>,
    /// Default boost for the related-ids clause.
    pub related_ids_boost: Option<f64>,
    /// Language analyzers; accepts a single string or an array.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    pub custom_analyzers: Option<Vec<String>>,
    /// Use the refactored membership filter.
    pub refactored_membership_filter: Option<bool>,
    /// Boost related ids in global work item searches.
    pub related_ids_in_global_search: Option<bool>,
    /// Multi-tenant SaaS deployment.
    pub saas: Option<bool>,
}

/// Raw hybrid search settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawHybridSettings {
    /// Master switch for hybrid work item search.
    pub enabled: Option<bool>,
    /// Instance-wide AI features switch.
    pub ai_global_switch: Option<bool>,
    /// Whether work item embeddings are indexed.
    pub work_item_embedding: Option<bool>,
    /// Whether AI features are purchasable on this instance.
    pub ai_available: Option<bool>,
    /// Minimum query length for hybrid search.
    pub min_query_length: Option<usize>,
    /// Vector store of the target cluster.
    pub vectors: Option<VectorStore>,
    /// Number of nearest neighbours.
    pub k: Option<u32>,
    /// Candidates considered per shard.
    pub num_candidates: Option<u32>,
    /// Minimum vector similarity.
    pub similarity: Option<f64>,
    /// Boost of the vector part.
    pub boost: Option<f64>,
    /// Boost of keyword clauses on OpenSearch.
    pub keyword_boost: Option<f64>,
    /// Embedding requests allowed per user per minute.
    pub embedding_requests_per_minute: Option<u32>,
}

/// Raw migration settings.
#[serde_as]
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMigrationSettings {
    /// Finished migrations; accepts a single string or an array.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    pub completed: Option<Vec<String>>,
}

/// Parses a configuration file from disk.
///
/// Returns a `RawConfig` with all fields as optionals, ready for merging.
pub fn parse_config_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;

    parse_config_str(&contents, path)
}

/// Parses configuration from a TOML string.
///
/// The `path` parameter is used for error reporting.
pub fn parse_config_str(contents: &str, path: &Path) -> Result<RawConfig, ConfigError> {
    toml::from_str(contents).map_err(|source| ConfigError::ParseToml {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses configuration from a TOML string without path context.
///
/// Useful for validating template content (tests only).
#[cfg(test)]
pub fn parse_config(contents: &str) -> Result<RawConfig, TomlError> {
    toml::from_str(contents)
}

/// Checks if a config file has `root = true` set.
///
/// This is used during discovery to stop traversal at root configs.
/// Returns false if the file cannot be read or parsed.
pub fn is_root_config(path: &Path) -> bool {
    let Ok(contents) = fs::read_to_string(path) else {
        return false;
    };
    let Ok(config) = toml::from_str::<RawConfig>(&contents) else {
        return false;
    };
    config.root == Some(true)
}
