//! Rendering for CLI output.

use std::{
    io::{self, IsTerminal},
    process::ExitCode,
};

use comfy_table::{Cell, Table, presets::UTF8_FULL_CONDENSED};
use esq_builder::{StageTrace, response::LabelBucket};
pub use esq_highlight::{dim, header, success, warning};
use esq_highlight::{Highlighter, plain_fragment, terminal_fragment};
use serde_json::Value;

/// Returns true when stdout is an interactive terminal.
pub fn colors_enabled() -> bool {
    io::stdout().is_terminal()
}

/// Prints a JSON value, pretty-printed and highlighted unless `compact`.
pub fn print_json(value: &Value, compact: bool) -> ExitCode {
    let rendered = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    let rendered = match rendered {
        Ok(rendered) => rendered,
        Err(e) => {
            eprintln!("error: failed to serialize JSON: {e}");
            return ExitCode::FAILURE;
        }
    };

    if !compact && colors_enabled() {
        println!("{}", Highlighter::new().highlight_json(&rendered));
    } else {
        println!("{rendered}");
    }
    ExitCode::SUCCESS
}

/// Renders a hit fragment, styling matches on terminals and stripping the markers otherwise.
pub fn fragment(text: &str, pre_tag: &str, post_tag: &str) -> String {
    if colors_enabled() {
        terminal_fragment(text, pre_tag, post_tag)
    } else {
        plain_fragment(text, pre_tag, post_tag)
    }
}

/// Formats the stages of a build as a table.
pub fn stage_table(stages: &[StageTrace]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["#", "stage", "filters added", "changed"]);
    for (i, stage) in stages.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(stage.name),
            Cell::new(stage.filters_added),
            Cell::new(if stage.changed { "yes" } else { "no" }),
        ]);
    }
    table
}

/// Formats label aggregation buckets as a table.
pub fn label_table(labels: &[LabelBucket]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_header(vec!["label id", "documents"]);
    for bucket in labels {
        table.add_row(vec![Cell::new(bucket.key), Cell::new(bucket.doc_count)]);
    }
    table
}
