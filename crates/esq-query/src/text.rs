//! Query string classification.
//!
//! Raw user input is inspected once to decide which query family to build: an exact IID lookup
//! (`#123`, `!123`), a `simple_query_string` when advanced operators are present, or a
//! `multi_match` otherwise.

use std::sync::LazyLock;

use regex::Regex;

/// Matches `#<digits>` (issues, work items) and `!<digits>` (merge requests).
static IID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[#!](\d+)$").expect("valid regex literal"));

/// Matches any operator understood by `simple_query_string`.
static ADVANCED_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[+*"\-|()~\\]"#).expect("valid regex literal"));

/// Matches a trailing `^N` field boost.
static FIELD_BOOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\^\d+(\.\d+)?$").expect("valid regex literal"));

/// Returns the IID when `query` is an exact IID reference such as `#42`.
pub fn iid(query: &str) -> Option<u64> {
    IID_PATTERN
        .captures(query.trim())
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Returns true when `query` uses advanced search operators.
pub fn has_advanced_syntax(query: &str) -> bool {
    ADVANCED_SYNTAX.is_match(query)
}

/// Returns true when `query` contains nothing but whitespace.
pub fn is_blank(query: &str) -> bool {
    query.trim().is_empty()
}

/// Strips a `^N` boost suffix from a field name (`title^2` becomes `title`).
pub fn strip_boost(field: &str) -> &str {
    match FIELD_BOOST.find(field) {
        Some(m) => &field[..m.start()],
        None => field,
    }
}
