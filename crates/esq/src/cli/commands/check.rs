//! Implementation of `esq check`.

use std::process::ExitCode;

use esq_config::{ConfigWarning, discover_config_files};

use crate::cli::{
    context::CommandContext,
    output::{dim, warning},
};

/// Lists the configuration files in effect and reports validation warnings.
///
/// Exits with failure when there are warnings.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let config_files = discover_config_files(&ctx.cwd);
    if config_files.is_empty() {
        println!("{}", dim("No configuration files found; using defaults."));
    } else {
        println!("Config files (highest precedence first):");
        for path in &config_files {
            println!("   {}", path.display());
        }
    }
    println!();

    let warnings = ctx.config.validate();
    if warnings.is_empty() {
        println!("No issues found.");
        return ExitCode::SUCCESS;
    }

    println!("Warnings ({}):", warnings.len());
    for w in &warnings {
        println!("   {}", warning(&w.to_string()));
    }
    println!();
    print_hints(&warnings);

    ExitCode::FAILURE
}

/// Prints hints for resolving common warnings.
fn print_hints(warnings: &[ConfigWarning]) {
    let mut hints: Vec<&str> = warnings
        .iter()
        .filter_map(|w| match w {
            ConfigWarning::HybridWithoutVectors => {
                Some("Hint: set [hybrid] vectors to \"elasticsearch\" or \"opensearch\"")
            }
            ConfigWarning::UnknownMigration { .. } => {
                Some("Hint: remove completed migrations that esq does not recognize")
            }
            ConfigWarning::UnknownAnalyzer { .. } => {
                Some("Hint: supported analyzers are \"smartcn\" and \"kuromoji\"")
            }
            _ => None,
        })
        .collect();
    hints.dedup();
    for hint in hints {
        println!("{}", dim(hint));
    }
}
