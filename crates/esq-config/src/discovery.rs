//! Configuration file discovery.
//!
//! Looks for `.esq.toml` in the working directory and each of its ancestors, then falls back to
//! the global `~/.esq.toml`. A file containing `root = true` ends the search.

use std::path::{Path, PathBuf};

use directories::BaseDirs;

use crate::parse::is_root_config;

/// The configuration filename.
pub const CONFIG_FILENAME: &str = ".esq.toml";

/// Discovers all configuration files relevant to the given directory.
///
/// Returns paths in precedence order: closest to `cwd` first, global (`~/.esq.toml`) last.
/// Returns an empty vector if no configuration files are found.
pub fn discover_config_files(cwd: &Path) -> Vec<PathBuf> {
    discover_with_global(cwd, global_config_path().as_deref())
}

/// Discovery with an explicit global config location.
fn discover_with_global(cwd: &Path, global: Option<&Path>) -> Vec<PathBuf> {
    let mut configs = Vec::new();

    for dir in cwd.ancestors() {
        let candidate = dir.join(CONFIG_FILENAME);
        if !candidate.is_file() {
            continue;
        }
        let is_root = is_root_config(&candidate);
        configs.push(candidate);
        if is_root {
            return configs;
        }
    }

    if let Some(global) = global
        && global.is_file()
        && !configs.iter().any(|c| c == global)
    {
        configs.push(global.to_path_buf());
    }

    configs
}

/// Returns the path to the global configuration file (`~/.esq.toml`).
///
/// Returns `None` if the home directory cannot be determined.
pub fn global_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILENAME))
}

/// Checks if a path is the global configuration file.
pub fn is_global_config(path: &Path) -> bool {
    global_config_path().is_some_and(|global| path == global)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    /// A plain config that does not stop discovery.
    const SEARCH_CONFIG: &str = "[search]\ndefault_per_page = 50\n";

    /// Temporary tree of project directories with `.esq.toml` files.
    struct Tree(TempDir);

    impl Tree {
        fn new() -> Self {
            Self(tempfile::tempdir().unwrap())
        }

        fn path(&self) -> &Path {
            self.0.path()
        }

        /// Creates `rel` (empty for the tree root) and returns it.
        fn dir(&self, rel: &str) -> PathBuf {
            let dir = self.path().join(rel);
            fs::create_dir_all(&dir).unwrap();
            dir
        }

        /// Writes a `.esq.toml` holding `content` into `rel`.
        fn config(&self, rel: &str, content: &str) -> PathBuf {
            let path = self.dir(rel).join(CONFIG_FILENAME);
            fs::write(&path, content).unwrap();
            path
        }
    }

    #[test]
    fn test_discover_no_configs() {
        let tree = Tree::new();
        let cwd = tree.dir("a/b/c");

        assert!(discover_with_global(&cwd, None).is_empty());
    }

    #[test]
    fn test_discover_single_config() {
        let tree = Tree::new();
        let config = tree.config("", SEARCH_CONFIG);
        let cwd = tree.dir("a/b/c");

        assert_eq!(discover_with_global(&cwd, None), vec![config]);
    }

    #[test]
    fn test_discover_precedence_order() {
        let tree = Tree::new();
        let instance = tree.config("", SEARCH_CONFIG);
        let group = tree.config("gitlab-org", "[hybrid]\nenabled = true\n");
        let project = tree.config("gitlab-org/gitlab", "[highlight]\npre_tag = \"<em>\"\n");
        let cwd = tree.dir("gitlab-org/gitlab/ee");

        assert_eq!(
            discover_with_global(&cwd, None),
            vec![project, group, instance]
        );
    }

    #[test]
    fn test_global_config_is_appended_last() {
        let tree = Tree::new();
        let global = tree.config("home", SEARCH_CONFIG);
        let local = tree.config("work/project", "[hybrid]\nvectors = \"opensearch\"\n");

        let configs = discover_with_global(&tree.path().join("work/project"), Some(&global));
        assert_eq!(configs, vec![local, global]);
    }

    #[test]
    fn test_global_config_not_duplicated() {
        let tree = Tree::new();
        let global = tree.config("home", SEARCH_CONFIG);
        let cwd = tree.dir("home/project");

        assert_eq!(discover_with_global(&cwd, Some(&global)), vec![global]);
    }

    #[test]
    fn test_missing_global_config_is_skipped() {
        let tree = Tree::new();
        let local = tree.config("", SEARCH_CONFIG);
        let missing = tree.path().join("nowhere").join(CONFIG_FILENAME);

        assert_eq!(discover_with_global(tree.path(), Some(&missing)), vec![local]);
    }

    #[test]
    fn test_discover_skips_non_file_config() {
        let tree = Tree::new();
        tree.dir(CONFIG_FILENAME);
        let cwd = tree.dir("subdir");

        assert!(discover_with_global(&cwd, None).is_empty());
    }

    #[test]
    fn test_root_config_stops_discovery() {
        let tree = Tree::new();
        tree.config("", SEARCH_CONFIG);
        let global = tree.config("home", SEARCH_CONFIG);
        let root = tree.config("project", "root = true\n");
        let cwd = tree.dir("project/src");

        // Neither the parent nor the global config is consulted past a root config
        assert_eq!(discover_with_global(&cwd, Some(&global)), vec![root]);
    }

    #[test]
    fn test_root_config_includes_child_configs() {
        let tree = Tree::new();
        tree.config("", SEARCH_CONFIG);
        let root = tree.config("project", "root = true\n[search]\nsaas = true\n");
        let child = tree.config("project/sub", SEARCH_CONFIG);
        let cwd = tree.dir("project/sub/deep");

        assert_eq!(discover_with_global(&cwd, None), vec![child, root]);
    }

    #[test]
    fn test_root_false_does_not_stop_discovery() {
        let tree = Tree::new();
        let parent = tree.config("", SEARCH_CONFIG);
        let mid = tree.config("project", "root = false\n");
        let cwd = tree.dir("project/src");

        assert_eq!(discover_with_global(&cwd, None), vec![mid, parent]);
    }

    #[test]
    fn test_unparseable_config_does_not_stop_discovery() {
        let tree = Tree::new();
        let parent = tree.config("", SEARCH_CONFIG);
        let broken = tree.config("project", "root = true\n[search\n");
        let cwd = tree.dir("project/src");

        assert_eq!(discover_with_global(&cwd, None), vec![broken, parent]);
    }

    #[test]
    fn test_global_config_path_ends_with_filename() {
        if let Some(path) = global_config_path() {
            assert!(path.ends_with(CONFIG_FILENAME));
            assert!(is_global_config(&path));
        }
        assert!(!is_global_config(Path::new("/some/other/path/.esq.toml")));
    }
}
