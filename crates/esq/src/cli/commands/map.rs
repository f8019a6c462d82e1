//! Implementation of `esq map`.

use std::{fs, io, process::ExitCode};

use esq_builder::{ResponseMapper, SearchResults};
use esq_config::HighlightSettings;
use serde_json::Value;

use crate::cli::{
    args::MapCommand,
    context::CommandContext,
    output::{dim, fragment, header, label_table, print_json},
};

/// Maps a raw search response and prints the record ids in hit order.
pub fn run(ctx: &CommandContext, cmd: &MapCommand) -> ExitCode {
    let text = if cmd.response == "-" {
        io::read_to_string(io::stdin())
    } else {
        fs::read_to_string(&cmd.response)
    };
    let text = match text {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: failed to read {}: {e}", cmd.response);
            return ExitCode::FAILURE;
        }
    };

    let results = match serde_json::from_str::<Value>(&text)
        .map_err(|e| format!("response is not valid JSON: {e}"))
        .and_then(|response| {
            ResponseMapper::new(cmd.primary_key.as_str())
                .map(&response)
                .map_err(|e| e.to_string())
        }) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cmd.json {
        return match serde_json::to_value(&results) {
            Ok(value) => print_json(&value, false),
            Err(e) => {
                eprintln!("error: failed to serialize JSON: {e}");
                ExitCode::FAILURE
            }
        };
    }

    print_results(&results, &ctx.config.highlight);
    ExitCode::SUCCESS
}

/// Prints hits with their highlighted fragments, then totals, cursor and label facets.
fn print_results(results: &SearchResults, tags: &HighlightSettings) {
    println!(
        "{}",
        header(&format!("{} of {} hits", results.ids.len(), results.total))
    );
    for id in &results.ids {
        println!("{id}");
        let Some(highlights) = results.highlights.get(id) else {
            continue;
        };
        for (field, fragments) in highlights {
            for text in fragments.as_array().into_iter().flatten().filter_map(Value::as_str) {
                println!(
                    "   {} {}",
                    dim(&format!("{field}:")),
                    fragment(text, &tags.pre_tag, &tags.post_tag)
                );
            }
        }
    }

    if let Some(cursor) = &results.cursor {
        println!();
        println!("{} [{}, {}]", dim("next cursor:"), cursor.0, cursor.1);
    }

    if !results.labels.is_empty() {
        println!();
        println!("{}", label_table(&results.labels));
    }
}
