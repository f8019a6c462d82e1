//! Configuration templates for `esq init`.
//!
//! Templates are kept as valid TOML under `templates/` and handed out commented-out, so a
//! freshly initialized project behaves exactly like one without a config file.

/// Local (project) configuration template.
const LOCAL_TEMPLATE: &str = include_str!("../templates/config.toml");

/// Global (`~/.esq.toml`) configuration template.
const GLOBAL_TEMPLATE: &str = include_str!("../templates/config-global.toml");

/// Returns the local configuration template as a commented-out example.
pub fn local_template() -> String {
    comment_template(LOCAL_TEMPLATE)
}

/// Returns the global configuration template as a commented-out example.
pub fn global_template() -> String {
    comment_template(GLOBAL_TEMPLATE)
}

/// Prefixes every setting and section header with `# `, leaving comments and blank lines alone.
fn comment_template(template: &str) -> String {
    template
        .lines()
        .map(|line| {
            if line.is_empty() || line.starts_with('#') {
                format!("{line}\n")
            } else {
                format!("# {line}\n")
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{migrations, parse::parse_config};

    #[test]
    fn local_template_parses_as_valid_toml() {
        let result = parse_config(LOCAL_TEMPLATE);
        assert!(result.is_ok(), "local template failed to parse: {result:?}");
    }

    #[test]
    fn global_template_parses_as_valid_toml() {
        let result = parse_config(GLOBAL_TEMPLATE);
        assert!(
            result.is_ok(),
            "global template failed to parse: {result:?}"
        );
    }

    #[test]
    fn local_template_migrations_are_known() {
        let config = parse_config(LOCAL_TEMPLATE).unwrap();
        let completed = config.migrations.and_then(|m| m.completed).unwrap();
        for name in completed {
            assert!(migrations::KNOWN.contains(&name.as_str()), "{name}");
        }
    }

    #[test]
    fn commented_template_is_inert() {
        let config = parse_config(&local_template()).unwrap();
        assert!(config.search.is_none());
        assert!(config.hybrid.is_none());
        assert!(local_template().contains("# [hybrid]"));
    }

    #[test]
    fn comment_template_preserves_comments_and_blank_lines() {
        let input = "# note\nkey = \"a\"\n\n[section]\n";
        assert_eq!(
            comment_template(input),
            "# note\n# key = \"a\"\n\n# [section]\n"
        );
    }
}
