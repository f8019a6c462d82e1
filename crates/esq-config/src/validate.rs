//! Configuration validation.
//!
//! Validates a loaded configuration and reports warnings for settings that would produce
//! surprising queries without being outright invalid.

use std::fmt;

use crate::{Config, VectorStore, migrations};

/// Largest bucket count the label aggregation requests.
pub const MAX_AGGREGATION_SIZE: u32 = 500;

/// Language analyzers with indexed sub-fields.
pub const SUPPORTED_ANALYZERS: &[&str] = &["smartcn", "kuromoji"];

/// A non-fatal warning about the configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    /// A highlight tag is empty, so matches would not be marked.
    EmptyHighlightTag {
        /// Which tag (`pre_tag` or `post_tag`).
        tag: &'static str,
    },
    /// The aggregation size exceeds the supported maximum and will be capped.
    AggregationSizeCapped {
        /// Configured size.
        size: u32,
    },
    /// The hybrid similarity threshold lies outside `0.0..=1.0`.
    SimilarityOutOfRange {
        /// Configured similarity.
        similarity: f64,
    },
    /// Hybrid search is enabled but no vector store is configured.
    HybridWithoutVectors,
    /// A custom analyzer has no indexed sub-fields.
    UnknownAnalyzer {
        /// Analyzer name.
        name: String,
    },
    /// A completed migration name is not recognized.
    UnknownMigration {
        /// Migration name.
        name: String,
    },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyHighlightTag { tag } => {
                write!(f, "highlight {tag} is empty; matches will not be marked")
            }
            Self::AggregationSizeCapped { size } => {
                write!(
                    f,
                    "aggregation_size {size} exceeds {MAX_AGGREGATION_SIZE} and will be capped"
                )
            }
            Self::SimilarityOutOfRange { similarity } => {
                write!(f, "hybrid similarity {similarity} is outside 0.0..=1.0")
            }
            Self::HybridWithoutVectors => {
                write!(
                    f,
                    "hybrid search is enabled but [hybrid] vectors is \"none\"; keyword search will be used"
                )
            }
            Self::UnknownAnalyzer { name } => {
                write!(f, "custom analyzer '{name}' is not supported")
            }
            Self::UnknownMigration { name } => {
                write!(f, "completed migration '{name}' is not recognized")
            }
        }
    }
}

/// Validates the configuration and returns any warnings.
pub fn validate_config(config: &Config) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if config.highlight.pre_tag.is_empty() {
        warnings.push(ConfigWarning::EmptyHighlightTag { tag: "pre_tag" });
    }
    if config.highlight.post_tag.is_empty() {
        warnings.push(ConfigWarning::EmptyHighlightTag { tag: "post_tag" });
    }

    if config.search.aggregation_size > MAX_AGGREGATION_SIZE {
        warnings.push(ConfigWarning::AggregationSizeCapped {
            size: config.search.aggregation_size,
        });
    }

    let similarity = config.hybrid.similarity;
    if !(0.0..=1.0).contains(&similarity) {
        warnings.push(ConfigWarning::SimilarityOutOfRange { similarity });
    }

    if config.hybrid.enabled && config.hybrid.vectors == VectorStore::None {
        warnings.push(ConfigWarning::HybridWithoutVectors);
    }

    for name in &config.search.custom_analyzers {
        if !SUPPORTED_ANALYZERS.contains(&name.as_str()) {
            warnings.push(ConfigWarning::UnknownAnalyzer { name: name.clone() });
        }
    }

    for name in &config.migrations.completed {
        if !migrations::KNOWN.contains(&name.as_str()) {
            warnings.push(ConfigWarning::UnknownMigration { name: name.clone() });
        }
    }

    warnings
}
