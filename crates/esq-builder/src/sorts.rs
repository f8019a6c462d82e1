//! Sort clauses.

use esq_query::{QueryDoc, SortClause, SortOrder};

use crate::options::SearchOptions;

/// Sortable attributes and the document fields holding them.
const SORT_FIELDS: &[(&str, &str, &str)] = &[
    ("created_at", "created", "created_at"),
    ("updated_at", "updated", "updated_at"),
    ("popularity", "popularity", "upvotes"),
];

/// Sorts by the requested attribute.
///
/// `order_by` names the attribute and `sort` the direction; without `order_by`, `sort` may
/// carry both (`created_desc`). Unknown combinations set an empty sort, leaving relevance
/// order.
pub fn sort_by(mut doc: QueryDoc, options: &SearchOptions) -> QueryDoc {
    doc.sort = Some(
        sort_clause(options.order_by.as_deref(), options.sort.as_deref())
            .into_iter()
            .collect(),
    );
    doc
}

/// Resolves `order_by` and `sort` into a single sort clause.
fn sort_clause(order_by: Option<&str>, sort: Option<&str>) -> Option<SortClause> {
    let (attribute, order) = match order_by {
        Some(order_by) => {
            let (_, _, field) = SORT_FIELDS.iter().find(|(name, _, _)| *name == order_by)?;
            (*field, sort?.parse::<SortOrder>().ok()?)
        }
        None => {
            let (prefix, order) = sort?.rsplit_once('_')?;
            let (_, _, field) = SORT_FIELDS.iter().find(|(_, short, _)| *short == prefix)?;
            (*field, order.parse::<SortOrder>().ok()?)
        }
    };
    Some(SortClause::new(attribute, order))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sorted(order_by: Option<&str>, sort: Option<&str>) -> serde_json::Value {
        let options = SearchOptions {
            order_by: order_by.map(String::from),
            sort: sort.map(String::from),
            ..SearchOptions::default()
        };
        sort_by(QueryDoc::default(), &options).to_json()["sort"].clone()
    }

    #[test]
    fn order_by_with_direction() {
        assert_eq!(
            sorted(Some("created_at"), Some("asc")),
            json!([{ "created_at": { "order": "asc" } }])
        );
        assert_eq!(
            sorted(Some("updated_at"), Some("desc")),
            json!([{ "updated_at": { "order": "desc" } }])
        );
    }

    #[test]
    fn combined_sort_values() {
        assert_eq!(sorted(None, Some("created_desc")), json!([{ "created_at": { "order": "desc" } }]));
        assert_eq!(sorted(None, Some("updated_asc")), json!([{ "updated_at": { "order": "asc" } }]));
        assert_eq!(sorted(None, Some("popularity_desc")), json!([{ "upvotes": { "order": "desc" } }]));
    }

    #[test]
    fn unknown_combinations_clear_the_sort() {
        assert_eq!(sorted(None, None), json!([]));
        assert_eq!(sorted(Some("title"), Some("asc")), json!([]));
        assert_eq!(sorted(None, Some("created_sideways")), json!([]));
        assert_eq!(sorted(Some("created_at"), None), json!([]));
    }
}
