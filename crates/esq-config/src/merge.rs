//! Configuration merging.
//!
//! Merges multiple `RawConfig` files into a single resolved `Config`,
//! applying precedence rules.

use std::path::PathBuf;

use crate::{
    Config, HighlightSettings, HybridSettings, MigrationSettings, SearchSettings,
    parse::{RawConfig, RawHighlightSettings, RawHybridSettings, RawSearchSettings},
};

/// A parsed config file with its source path.
pub struct ParsedConfig {
    /// Path to the config file.
    pub path: PathBuf,
    /// Parsed raw configuration.
    pub config: RawConfig,
}

/// Merges multiple configuration files into a single resolved `Config`.
///
/// Configs should be provided in precedence order: highest precedence first (closest to CWD),
/// lowest precedence last (global config).
///
/// Merge rules:
/// - Scalar settings: first defined value wins (highest precedence)
/// - List settings (`custom_analyzers`): first defined list wins completely
/// - Completed migrations: union of all files, highest precedence first
pub fn merge_configs(configs: &[ParsedConfig]) -> Config {
    if configs.is_empty() {
        return Config::default();
    }

    let config_root = configs
        .first()
        .and_then(|c| c.path.parent())
        .map(|p| p.to_path_buf());

    Config {
        highlight: merge_highlight(configs),
        search: merge_search(configs),
        hybrid: merge_hybrid(configs),
        migrations: merge_migrations(configs),
        config_root,
    }
}

/// Merges highlight settings.
fn merge_highlight(configs: &[ParsedConfig]) -> HighlightSettings {
    let mut result = HighlightSettings::default();

    // Iterate in reverse (lowest precedence first) so higher precedence overwrites
    for parsed in configs.iter().rev() {
        if let Some(ref highlight) = parsed.config.highlight {
            apply_raw_highlight(&mut result, highlight);
        }
    }

    result
}

/// Applies raw highlight settings to result.
fn apply_raw_highlight(result: &mut HighlightSettings, raw: &RawHighlightSettings) {
    if let Some(ref v) = raw.pre_tag {
        result.pre_tag = v.clone();
    }
    if let Some(ref v) = raw.post_tag {
        result.post_tag = v.clone();
    }
}

/// Merges search settings.
fn merge_search(configs: &[ParsedConfig]) -> SearchSettings {
    let mut result = SearchSettings::default();

    for parsed in configs.iter().rev() {
        if let Some(ref search) = parsed.config.search {
            apply_raw_search(&mut result, search);
        }
    }

    result
}

/// Applies raw search settings to result.
fn apply_raw_search(result: &mut SearchSettings, raw: &RawSearchSettings) {
    if let Some(v) = raw.default_per_page {
        result.default_per_page = v;
    }
    if let Some(v) = raw.aggregation_size {
        result.aggregation_size = v;
    }
    if let Some(v) = raw.related_ids_boost {
        result.related_ids_boost = v;
    }
    if let Some(ref v) = raw.custom_analyzers {
        result.custom_analyzers = v.clone();
    }
    if let Some(v) = raw.refactored_membership_filter {
        result.refactored_membership_filter = v;
    }
    if let Some(v) = raw.related_ids_in_global_search {
        result.related_ids_in_global_search = v;
    }
    if let Some(v) = raw.saas {
        result.saas = v;
    }
}

/// Merges hybrid search settings.
fn merge_hybrid(configs: &[ParsedConfig]) -> HybridSettings {
    let mut result = HybridSettings::default();

    for parsed in configs.iter().rev() {
        if let Some(ref hybrid) = parsed.config.hybrid {
            apply_raw_hybrid(&mut result, hybrid);
        }
    }

    result
}

/// Applies raw hybrid settings to result.
fn apply_raw_hybrid(result: &mut HybridSettings, raw: &RawHybridSettings) {
    if let Some(v) = raw.enabled {
        result.enabled = v;
    }
    if let Some(v) = raw.ai_global_switch {
        result.ai_global_switch = v;
    }
    if let Some(v) = raw.work_item_embedding {
        result.work_item_embedding = v;
    }
    if let Some(v) = raw.ai_available {
        result.ai_available = v;
    }
    if let Some(v) = raw.min_query_length {
        result.min_query_length = v;
    }
    if let Some(v) = raw.vectors {
        result.vectors = v;
    }
    if let Some(v) = raw.k {
        result.k = v;
    }
    if let Some(v) = raw.num_candidates {
        result.num_candidates = v;
    }
    if let Some(v) = raw.similarity {
        result.similarity = v;
    }
    if let Some(v) = raw.boost {
        result.boost = v;
    }
    if let Some(v) = raw.keyword_boost {
        result.keyword_boost = v;
    }
    if let Some(v) = raw.embedding_requests_per_minute {
        result.embedding_requests_per_minute = v;
    }
}

/// Unions completed migrations across all files.
fn merge_migrations(configs: &[ParsedConfig]) -> MigrationSettings {
    let mut result = MigrationSettings::default();

    for parsed in configs {
        let Some(completed) = parsed
            .config
            .migrations
            .as_ref()
            .and_then(|m| m.completed.as_ref())
        else {
            continue;
        };
        for name in completed {
            if !result.completed.contains(name) {
                result.completed.push(name.clone());
            }
        }
    }

    result
}
