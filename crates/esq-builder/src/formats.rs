//! Response shaping: returned fields, page size and offset.

use esq_config::Config;
use esq_query::QueryDoc;

use crate::options::SearchOptions;

/// Limits the stored fields returned per hit.
pub fn source_fields(mut doc: QueryDoc, options: &SearchOptions) -> QueryDoc {
    if !options.source_fields.is_empty() {
        doc.source = Some(options.source_fields.clone());
    }
    doc
}

/// Sets the number of hits: none for counts, otherwise one page.
pub fn size(mut doc: QueryDoc, options: &SearchOptions, config: &Config) -> QueryDoc {
    doc.size = Some(if options.count_only {
        0
    } else {
        per_page(options, config)
    });
    doc
}

/// Sets the offset of the requested one-based page.
///
/// Offsets past `u64::MAX` saturate; the engine rejects them as beyond its result window.
pub fn page(mut doc: QueryDoc, options: &SearchOptions, config: &Config) -> QueryDoc {
    if let Some(page) = options.page {
        doc.from = Some(page.saturating_sub(1).saturating_mul(per_page(options, config)));
    }
    doc
}

/// Returns the requested page size, or the configured default.
fn per_page(options: &SearchOptions, config: &Config) -> u64 {
    options.per_page.unwrap_or(config.search.default_per_page)
}
