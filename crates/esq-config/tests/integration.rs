//! Integration tests for esq-config.
//!
//! Tests the full configuration loading pipeline: discovery -> parse -> merge -> validate.

// Integration tests live outside cfg(test) by design
#![allow(clippy::tests_outside_test_module)]

use std::{
    fs,
    path::{Path, PathBuf},
};

use esq_config::{Config, ConfigError, ConfigWarning, VectorStore};

/// Test helper to create a temporary directory structure for tests.
struct TestEnv {
    /// Owned temporary root.
    root: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
        }
    }

    fn path(&self) -> &Path {
        self.root.path()
    }

    /// Creates a directory and returns its path.
    fn create_dir(&self, rel_path: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        fs::create_dir_all(&path).unwrap();
        path
    }

    /// Creates a file with content and returns its path.
    fn create_file(&self, rel_path: &str, content: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }
}

#[test]
fn test_load_from_no_files_returns_default() {
    let config = Config::load_from_files(&[]).unwrap();

    assert!(config.config_root.is_none());
    assert_eq!(config.search.default_per_page, 20);
    assert_eq!(config.hybrid.vectors, VectorStore::None);
}

#[test]
fn test_load_single_config() {
    let env = TestEnv::new();
    env.create_file(
        ".esq.toml",
        r#"
root = true

[search]
default_per_page = 50
custom_analyzers = "smartcn"

[hybrid]
enabled = true
vectors = "elasticsearch"
"#,
    );

    let config = Config::load(env.path()).unwrap();

    assert_eq!(config.config_root.as_deref(), Some(env.path()));
    assert_eq!(config.search.default_per_page, 50);
    assert_eq!(config.search.custom_analyzers, vec!["smartcn"]);
    assert!(config.hybrid.enabled);
    assert_eq!(config.hybrid.vectors, VectorStore::Elasticsearch);
    assert!(config.validate().is_empty());
}

#[test]
fn test_nested_configs_merge_closest_first() {
    let env = TestEnv::new();
    env.create_file(
        ".esq.toml",
        r#"
root = true

[search]
default_per_page = 10
aggregation_size = 100

[migrations]
completed = "backfill_work_item_milestone_data"
"#,
    );
    env.create_file(
        "team/.esq.toml",
        r#"
[search]
default_per_page = 40

[migrations]
completed = ["add_extra_fields_to_work_items"]
"#,
    );
    let cwd = env.create_dir("team/service");

    let config = Config::load(&cwd).unwrap();

    assert_eq!(config.config_root, Some(env.path().join("team")));
    assert_eq!(config.search.default_per_page, 40);
    assert_eq!(config.search.aggregation_size, 100);
    assert!(config.migrations.is_finished("backfill_work_item_milestone_data"));
    assert!(config.migrations.is_finished("add_extra_fields_to_work_items"));
}

#[test]
fn test_invalid_toml_reports_parse_error() {
    let env = TestEnv::new();
    env.create_file(".esq.toml", "root = true\n[search\n");

    let err = Config::load(env.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { .. }));
}

#[test]
fn test_wrong_type_reports_parse_error() {
    let env = TestEnv::new();
    env.create_file(".esq.toml", "root = true\n[search]\ndefault_per_page = \"many\"\n");

    let err = Config::load(env.path()).unwrap_err();
    assert!(matches!(err, ConfigError::ParseToml { .. }));
}

#[test]
fn test_missing_file_reports_read_error() {
    let env = TestEnv::new();
    let missing = env.path().join("absent.toml");

    let err = Config::load_from_files(&[missing.clone()]).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
    assert_eq!(err.path(), missing);
}

#[test]
fn test_validation_warnings_survive_loading() {
    let env = TestEnv::new();
    env.create_file(
        ".esq.toml",
        r#"
root = true

[hybrid]
enabled = true

[migrations]
completed = ["not_a_real_migration"]
"#,
    );

    let warnings = Config::load(env.path()).unwrap().validate();
    assert!(warnings.contains(&ConfigWarning::HybridWithoutVectors));
    assert!(warnings.contains(&ConfigWarning::UnknownMigration {
        name: "not_a_real_migration".into()
    }));
}

#[test]
fn test_effective_settings_round_trip() {
    let env = TestEnv::new();
    env.create_file(
        ".esq.toml",
        "root = true\n[highlight]\npre_tag = \"<mark>\"\npost_tag = \"</mark>\"\n",
    );
    let config = Config::load(env.path()).unwrap();

    let reloaded_path = env.create_file("copy/.esq.toml", &config.settings_to_toml());
    let reloaded = Config::load_from_files(&[reloaded_path]).unwrap();

    assert_eq!(reloaded.highlight.pre_tag, "<mark>");
    assert_eq!(reloaded.highlight.post_tag, "</mark>");
    assert_eq!(reloaded.hybrid.k, config.hybrid.k);
}
