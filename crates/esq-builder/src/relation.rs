//! Lazily executed searches.

use esq_query::QueryDoc;
use serde_json::Value;
use tracing::debug;

use crate::{
    BuildError, ClientError,
    pagination::{Cursor, Pagination},
    response::{ResponseMapper, SearchResults},
};

/// Sends search requests to a cluster.
///
/// Transport, retries and authentication live behind this trait.
pub trait SearchClient {
    /// Runs `body` against `index` and returns the raw response.
    fn search(&self, index: &str, body: &Value) -> Result<Value, ClientError>;
}

/// A built search request bound to a client.
///
/// The request runs at most once; results are cached.
pub struct Relation<'c, C: SearchClient + ?Sized> {
    /// Client executing the request.
    client: &'c C,
    /// Target index.
    index: String,
    /// The request.
    doc: QueryDoc,
    /// Maps the raw response.
    mapper: ResponseMapper,
    /// Whether the request scans backwards and hits must be reversed.
    reversed: bool,
    /// Cached results.
    results: Option<SearchResults>,
}

impl<'c, C: SearchClient + ?Sized> Relation<'c, C> {
    /// Binds `doc` to `client` and `index`.
    pub fn new(client: &'c C, index: impl Into<String>, doc: QueryDoc) -> Self {
        Self {
            client,
            index: index.into(),
            doc,
            mapper: ResponseMapper::default(),
            reversed: false,
            results: None,
        }
    }

    /// Uses `mapper` to read the response.
    #[must_use]
    pub fn with_mapper(self, mapper: ResponseMapper) -> Self {
        Self { mapper, ..self }
    }

    /// Returns the request.
    pub fn doc(&self) -> &QueryDoc {
        &self.doc
    }

    /// Returns a relation for the first `size` hits after `after`.
    pub fn first(&self, size: u64, after: Option<&Cursor>) -> Result<Self, BuildError> {
        let doc = Pagination::new(self.doc.clone())?.first(size, after);
        Ok(self.page(doc, false))
    }

    /// Returns a relation for the last `size` hits before `before`.
    ///
    /// Hits are returned in display order even though the engine scans backwards.
    pub fn last(&self, size: u64, before: Option<&Cursor>) -> Result<Self, BuildError> {
        let doc = Pagination::new(self.doc.clone())?.last(size, before);
        Ok(self.page(doc, true))
    }

    /// Creates an unexecuted relation for a page of this one.
    fn page(&self, doc: QueryDoc, reversed: bool) -> Self {
        Self {
            client: self.client,
            index: self.index.clone(),
            doc,
            mapper: self.mapper.clone(),
            reversed,
            results: None,
        }
    }

    /// Executes the request on first use and returns the mapped results.
    pub fn results(&mut self) -> Result<&SearchResults, ClientError> {
        let results = match self.results.take() {
            Some(results) => results,
            None => self.execute()?,
        };
        Ok(self.results.insert(results))
    }

    /// Returns the record ids in display order.
    pub fn ids(&mut self) -> Result<Vec<String>, ClientError> {
        Ok(self.results()?.ids.clone())
    }

    /// Runs the request.
    fn execute(&self) -> Result<SearchResults, ClientError> {
        debug!(index = %self.index, "executing search");
        let response = self.client.search(&self.index, &self.doc.to_json())?;
        let mut results = self.mapper.map(&response)?;
        if self.reversed {
            results.reverse();
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use esq_query::{SortClause, SortOrder};
    use serde_json::json;

    use super::*;

    /// Replays a canned response and records requests.
    struct FakeClient {
        response: Value,
        calls: Cell<usize>,
        bodies: RefCell<Vec<Value>>,
    }

    impl FakeClient {
        fn new(response: Value) -> Self {
            Self {
                response,
                calls: Cell::new(0),
                bodies: RefCell::new(Vec::new()),
            }
        }
    }

    impl SearchClient for FakeClient {
        fn search(&self, _index: &str, body: &Value) -> Result<Value, ClientError> {
            self.calls.set(self.calls.get() + 1);
            self.bodies.borrow_mut().push(body.clone());
            Ok(self.response.clone())
        }
    }

    fn response() -> Value {
        json!({ "hits": { "total": { "value": 2 }, "hits": [
            { "_source": { "id": 1 }, "sort": [10, 1] },
            { "_source": { "id": 2 }, "sort": [20, 2] }
        ] } })
    }

    fn sorted() -> QueryDoc {
        QueryDoc {
            sort: Some(vec![SortClause::new("created_at", SortOrder::Asc)]),
            ..QueryDoc::default()
        }
    }

    #[test]
    fn executes_once() {
        let client = FakeClient::new(response());
        let mut relation = Relation::new(&client, "gitlab-issues", sorted());
        assert_eq!(relation.ids().unwrap(), vec!["1", "2"]);
        assert_eq!(relation.results().unwrap().total, 2);
        assert_eq!(client.calls.get(), 1);
    }

    #[test]
    fn keyset_pages_send_cursor_filters() {
        let client = FakeClient::new(response());
        let relation = Relation::new(&client, "gitlab-issues", sorted());
        let mut page = relation.first(2, Some(&Cursor::new(5, 9))).unwrap();
        let cursor = page.results().unwrap().cursor.clone();
        assert_eq!(cursor, Some(Cursor::new(20, 2)));

        let body = client.bodies.borrow()[0].clone();
        assert_eq!(body["size"], json!(2));
        assert_eq!(
            body["query"]["bool"]["filter"][0]["bool"]["should"][0],
            json!({ "range": { "created_at": { "gt": 5 } } })
        );
    }

    #[test]
    fn backward_pages_are_returned_in_display_order() {
        let client = FakeClient::new(response());
        let relation = Relation::new(&client, "gitlab-issues", sorted());
        let mut page = relation.last(2, None).unwrap();
        assert_eq!(page.ids().unwrap(), vec!["2", "1"]);
        assert_eq!(
            client.bodies.borrow()[0]["sort"],
            json!([{ "created_at": { "order": "desc" } }, { "id": { "order": "desc" } }])
        );
    }

    #[test]
    fn custom_mapper_reads_another_key() {
        let client = FakeClient::new(json!({ "hits": { "total": 1, "hits": [
            { "_source": { "id": 1, "iid": 7 } }
        ] } }));
        let mut relation = Relation::new(&client, "gitlab-issues", QueryDoc::default())
            .with_mapper(ResponseMapper::new("iid"));
        assert_eq!(relation.ids().unwrap(), vec!["7"]);
    }

    #[test]
    fn paging_needs_a_sort() {
        let client = FakeClient::new(response());
        let relation = Relation::new(&client, "gitlab-issues", QueryDoc::default());
        assert!(matches!(relation.first(2, None), Err(BuildError::MissingSort)));
    }

    #[test]
    fn client_errors_propagate() {
        struct Down;
        impl SearchClient for Down {
            fn search(&self, _index: &str, _body: &Value) -> Result<Value, ClientError> {
                Err(ClientError::Transport("connection refused".into()))
            }
        }
        let mut relation = Relation::new(&Down, "gitlab-issues", QueryDoc::default());
        assert_eq!(
            relation.ids(),
            Err(ClientError::Transport("connection refused".into()))
        );
    }
}
