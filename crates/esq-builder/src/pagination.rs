//! Keyset pagination.
//!
//! A page boundary is described by a [`Cursor`]: the primary sort value and tie-breaker value
//! of the last hit seen. The next page holds documents strictly beyond that pair in scan order.

use esq_query::{QueryDoc, SortClause, SortOrder};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::BuildError;

/// Tie-breaker field used when the document sorts on a single field.
pub const DEFAULT_TIE_BREAKER: &str = "id";

/// Sort values of the hit a page starts after (or ends before).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Cursor(pub Value, pub Value);

impl Cursor {
    /// Creates a cursor from a primary sort value and a tie-breaker value.
    pub fn new(sort_value: impl Into<Value>, tie_breaker_value: impl Into<Value>) -> Self {
        Self(sort_value.into(), tie_breaker_value.into())
    }

    /// Reads a cursor from a hit's `sort` array.
    pub fn from_sort_values(values: &[Value]) -> Option<Self> {
        match values {
            [sort_value, tie_breaker_value, ..] => {
                Some(Self(sort_value.clone(), tie_breaker_value.clone()))
            }
            _ => None,
        }
    }
}

/// Which side of the cursor a page lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    /// Documents following the cursor.
    After,
    /// Documents preceding the cursor.
    Before,
}

impl CursorMode {
    /// Returns the range operator selecting documents beyond the cursor for a field sorted in
    /// `order`.
    pub fn operator(self, order: SortOrder) -> &'static str {
        match (order, self) {
            (SortOrder::Asc, Self::After) | (SortOrder::Desc, Self::Before) => "gt",
            (SortOrder::Asc, Self::Before) | (SortOrder::Desc, Self::After) => "lt",
        }
    }
}

/// Keyset pagination over a sorted document.
#[derive(Debug, Clone)]
pub struct Pagination {
    /// The document being paginated.
    doc: QueryDoc,
    /// The primary sort clause.
    primary: SortClause,
    /// The secondary sort clause breaking ties on the primary field.
    tie_breaker: SortClause,
}

impl Pagination {
    /// Prepares `doc` for keyset pagination.
    ///
    /// The first sort clause is the primary one; the second, if present, breaks ties. Without
    /// one, ties are broken on [`DEFAULT_TIE_BREAKER`] in the primary direction.
    pub fn new(doc: QueryDoc) -> Result<Self, BuildError> {
        let clauses = doc.sort.as_deref().unwrap_or_default();
        let primary = clauses.first().cloned().ok_or(BuildError::MissingSort)?;
        let tie_breaker = clauses
            .get(1)
            .cloned()
            .unwrap_or_else(|| SortClause::new(DEFAULT_TIE_BREAKER, primary.order));
        Ok(Self {
            doc,
            primary,
            tie_breaker,
        })
    }

    /// Returns the first `size` documents, starting after `after` when given.
    pub fn first(&self, size: u64, after: Option<&Cursor>) -> QueryDoc {
        self.paginate(size, after.map(|c| (c, CursorMode::After)), false)
    }

    /// Returns the last `size` documents, ending before `before` when given.
    ///
    /// The sort is reversed so the engine scans backwards; callers reverse the hits to restore
    /// display order.
    pub fn last(&self, size: u64, before: Option<&Cursor>) -> QueryDoc {
        self.paginate(size, before.map(|c| (c, CursorMode::Before)), true)
    }

    /// Builds one page.
    fn paginate(&self, size: u64, cursor: Option<(&Cursor, CursorMode)>, reverse: bool) -> QueryDoc {
        let mut doc = self.doc.clone();
        let order = |clause: &SortClause| {
            let order = if reverse { clause.order.reverse() } else { clause.order };
            SortClause::new(clause.field.clone(), order)
        };
        doc.sort = Some(vec![order(&self.primary), order(&self.tie_breaker)]);
        doc.size = Some(size);
        doc.from = None;

        if let Some((cursor, mode)) = cursor {
            doc.add_filter(self.cursor_filter(cursor, mode));
        }
        doc
    }

    /// Selects documents strictly beyond `cursor`, falling back to the tie-breaker when the
    /// primary values are equal.
    fn cursor_filter(&self, cursor: &Cursor, mode: CursorMode) -> Value {
        let Cursor(sort_value, tie_breaker_value) = cursor;
        let primary = self.primary.field.as_str();
        let tie_breaker = self.tie_breaker.field.as_str();
        let primary_op = mode.operator(self.primary.order);
        let tie_breaker_op = mode.operator(self.tie_breaker.order);

        json!({
            "bool": {
                "should": [
                    { "range": { primary: { primary_op: sort_value } } },
                    { "bool": { "must": [
                        { "term": { primary: sort_value } },
                        { "range": { tie_breaker: { tie_breaker_op: tie_breaker_value } } }
                    ] } }
                ],
                "minimum_should_match": 1
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted_doc(clauses: Vec<SortClause>) -> QueryDoc {
        QueryDoc {
            sort: Some(clauses),
            ..QueryDoc::default()
        }
    }

    #[test]
    fn operator_table() {
        assert_eq!(CursorMode::After.operator(SortOrder::Asc), "gt");
        assert_eq!(CursorMode::Before.operator(SortOrder::Asc), "lt");
        assert_eq!(CursorMode::After.operator(SortOrder::Desc), "lt");
        assert_eq!(CursorMode::Before.operator(SortOrder::Desc), "gt");
    }

    #[test]
    fn missing_sort_is_an_error() {
        assert_eq!(
            Pagination::new(QueryDoc::default()).unwrap_err(),
            BuildError::MissingSort
        );
        assert_eq!(
            Pagination::new(sorted_doc(Vec::new())).unwrap_err(),
            BuildError::MissingSort
        );
    }

    #[test]
    fn first_page_adds_default_tie_breaker() {
        let pagination =
            Pagination::new(sorted_doc(vec![SortClause::new("created_at", SortOrder::Desc)]))
                .unwrap();
        let doc = pagination.first(20, None);
        assert_eq!(
            doc.to_json(),
            json!({
                "query": { "bool": {} },
                "sort": [{ "created_at": { "order": "desc" } }, { "id": { "order": "desc" } }],
                "size": 20
            })
        );
    }

    #[test]
    fn after_cursor_filters_past_boundary() {
        let pagination =
            Pagination::new(sorted_doc(vec![SortClause::new("created_at", SortOrder::Asc)]))
                .unwrap();
        let doc = pagination.first(5, Some(&Cursor::new("2024-01-01", 7)));
        assert_eq!(
            doc.filters(),
            &[json!({ "bool": {
                "should": [
                    { "range": { "created_at": { "gt": "2024-01-01" } } },
                    { "bool": { "must": [
                        { "term": { "created_at": "2024-01-01" } },
                        { "range": { "id": { "gt": 7 } } }
                    ] } }
                ],
                "minimum_should_match": 1
            } })]
        );
    }

    #[test]
    fn last_page_reverses_both_fields() {
        let pagination = Pagination::new(sorted_doc(vec![
            SortClause::new("updated_at", SortOrder::Desc),
            SortClause::new("iid", SortOrder::Asc),
        ]))
        .unwrap();
        let doc = pagination.last(3, Some(&Cursor::new(100, 4)));
        assert_eq!(
            doc.sort,
            Some(vec![
                SortClause::new("updated_at", SortOrder::Asc),
                SortClause::new("iid", SortOrder::Desc),
            ])
        );
        let should = &doc.filters()[0]["bool"]["should"];
        assert_eq!(should[0], json!({ "range": { "updated_at": { "gt": 100 } } }));
        assert_eq!(should[1]["bool"]["must"][1], json!({ "range": { "iid": { "lt": 4 } } }));
    }

    #[test]
    fn pagination_replaces_offset() {
        let mut doc = sorted_doc(vec![SortClause::new("created_at", SortOrder::Asc)]);
        doc.from = Some(40);
        let doc = Pagination::new(doc).unwrap().first(20, None);
        assert_eq!(doc.from, None);
    }

    #[test]
    fn cursor_from_hit_sort_values() {
        assert_eq!(
            Cursor::from_sort_values(&[json!(1), json!(2)]),
            Some(Cursor::new(1, 2))
        );
        assert_eq!(Cursor::from_sort_values(&[json!(1)]), None);
    }
}
