//! Implementation of `esq config`.

use std::process::ExitCode;

use esq_highlight::Highlighter;

use crate::cli::{context::CommandContext, output::colors_enabled};

/// Shows effective configuration settings.
pub fn run(ctx: &CommandContext) -> ExitCode {
    let settings = ctx.config.settings_to_toml();
    if colors_enabled() {
        print!("{}", Highlighter::new().highlight_toml(&settings));
    } else {
        print!("{settings}");
    }
    ExitCode::SUCCESS
}
