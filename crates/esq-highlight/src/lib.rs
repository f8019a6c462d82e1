//! Terminal highlighting for esq.
//!
//! Renders built request bodies and configuration with syntax colors, and turns the engine's
//! highlight markers inside hit fragments into terminal styling.

#![warn(missing_docs)]

use syntect::{
    easy::HighlightLines,
    highlighting::Style,
    parsing::SyntaxSet,
    util::{LinesWithEndings, as_24_bit_terminal_escaped},
};
use two_face::{
    syntax::extra_newlines as extra_syntaxes,
    theme::{EmbeddedLazyThemeSet, EmbeddedThemeName, extra as extra_themes},
};

/// A syntax highlighter for terminal output.
pub struct Highlighter {
    /// Language definitions, including TOML from the two-face extras.
    syntax_set: SyntaxSet,
    /// Color themes.
    theme_set: EmbeddedLazyThemeSet,
    /// The theme in use.
    theme: EmbeddedThemeName,
}

impl Default for Highlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter {
    /// Creates a highlighter with the Dracula theme.
    pub fn new() -> Self {
        Self {
            syntax_set: extra_syntaxes(),
            theme_set: extra_themes(),
            theme: EmbeddedThemeName::Dracula,
        }
    }

    /// Highlights a JSON request or response body.
    pub fn highlight_json(&self, content: &str) -> String {
        self.highlight(content, "json")
    }

    /// Highlights TOML configuration.
    pub fn highlight_toml(&self, content: &str) -> String {
        self.highlight(content, "toml")
    }

    /// Highlights `content` as `syntax_name`, an extension or a language name.
    ///
    /// Unknown syntaxes are rendered as plain text.
    pub fn highlight(&self, content: &str, syntax_name: &str) -> String {
        let syntax = self
            .syntax_set
            .find_syntax_by_extension(syntax_name)
            .or_else(|| self.syntax_set.find_syntax_by_name(syntax_name))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let theme = self.theme_set.get(self.theme);
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut output = String::new();
        for line in LinesWithEndings::from(content) {
            let ranges: Vec<(Style, &str)> = highlighter
                .highlight_line(line, &self.syntax_set)
                .unwrap_or_else(|_| vec![(Style::default(), line)]);
            output.push_str(&as_24_bit_terminal_escaped(&ranges[..], false));
        }
        output.push_str(colors::RESET);
        output
    }
}

/// ANSI color codes for terminal output.
pub mod colors {
    /// Bold text.
    pub const BOLD: &str = "\x1b[1m";
    /// Cyan text (for headers).
    pub const CYAN: &str = "\x1b[36m";
    /// Green text (for success).
    pub const GREEN: &str = "\x1b[32m";
    /// Yellow text (for warnings and matches).
    pub const YELLOW: &str = "\x1b[33m";
    /// Red text (for errors).
    pub const RED: &str = "\x1b[31m";
    /// Dim text.
    pub const DIM: &str = "\x1b[2m";
    /// Reset all formatting.
    pub const RESET: &str = "\x1b[0m";
}

/// Formats a header with bold cyan styling.
pub fn header(text: &str) -> String {
    format!("{}{}{}{}", colors::BOLD, colors::CYAN, text, colors::RESET)
}

/// Formats text as dimmed.
pub fn dim(text: &str) -> String {
    format!("{}{}{}", colors::DIM, text, colors::RESET)
}

/// Formats text as a success message (green).
pub fn success(text: &str) -> String {
    format!("{}{}{}", colors::GREEN, text, colors::RESET)
}

/// Formats text as a warning (yellow).
pub fn warning(text: &str) -> String {
    format!("{}{}{}", colors::YELLOW, text, colors::RESET)
}

/// Formats text as an error (red).
pub fn error(text: &str) -> String {
    format!("{}{}{}", colors::RED, text, colors::RESET)
}

/// Replaces engine highlight markers in a hit fragment.
///
/// Every `pre_tag`...`post_tag` span is wrapped in `open` and `close`. An unterminated span runs
/// to the end of the fragment.
pub fn mark_fragment(
    fragment: &str,
    pre_tag: &str,
    post_tag: &str,
    open: &str,
    close: &str,
) -> String {
    if pre_tag.is_empty() || post_tag.is_empty() {
        return fragment.to_string();
    }

    let mut output = String::with_capacity(fragment.len());
    let mut rest = fragment;
    while let Some(start) = rest.find(pre_tag) {
        output.push_str(&rest[..start]);
        rest = &rest[start + pre_tag.len()..];
        let (matched, after) = match rest.find(post_tag) {
            Some(end) => (&rest[..end], &rest[end + post_tag.len()..]),
            None => (rest, ""),
        };
        output.push_str(open);
        output.push_str(matched);
        output.push_str(close);
        rest = after;
    }
    output.push_str(rest);
    output
}

/// Renders a hit fragment for the terminal, showing matches in bold yellow.
pub fn terminal_fragment(fragment: &str, pre_tag: &str, post_tag: &str) -> String {
    let open = format!("{}{}", colors::BOLD, colors::YELLOW);
    mark_fragment(fragment, pre_tag, post_tag, &open, colors::RESET)
}

/// Removes engine highlight markers from a hit fragment.
pub fn plain_fragment(fragment: &str, pre_tag: &str, post_tag: &str) -> String {
    mark_fragment(fragment, pre_tag, post_tag, "", "")
}
