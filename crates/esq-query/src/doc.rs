//! The search request document.
//!
//! [`QueryDoc`] is threaded through every builder stage. Its top-level members are typed so a
//! stage can only touch the part of the request it owns; in particular filters are appended via
//! [`QueryDoc::add_filter`] and there is no way to replace the filter list wholesale.

use std::{fmt, str::FromStr};

use serde::{Serialize, Serializer, ser::SerializeMap};
use serde_json::{Map, Value, json};

use crate::{BoolExpr, Occur, QueryError};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortOrder {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// Returns the opposite direction.
    pub fn reverse(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    /// Returns the JSON value for this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(QueryError::InvalidSortOrder(s.to_string())),
        }
    }
}

/// One `{field: {order: ...}}` entry of the `sort` member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    /// Field to sort on.
    pub field: String,
    /// Sort direction.
    pub order: SortOrder,
}

impl SortClause {
    /// Creates a sort clause.
    pub fn new(field: impl Into<String>, order: SortOrder) -> Self {
        Self {
            field: field.into(),
            order,
        }
    }
}

impl Serialize for SortClause {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.field, &json!({ "order": self.order.as_str() }))?;
        map.end()
    }
}

/// Highlight request attached to full-text queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    /// Fields to highlight, each mapped to its (empty) options object.
    pub fields: Map<String, Value>,
    /// Number of fragments; 0 returns whole field values.
    pub number_of_fragments: u32,
    /// Markup inserted before a match.
    pub pre_tags: Vec<String>,
    /// Markup inserted after a match.
    pub post_tags: Vec<String>,
}

impl Highlight {
    /// Creates a highlight request for `fields` using whole-field fragments.
    pub fn new<I, S>(fields: I, pre_tag: &str, post_tag: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|f| (f.into(), json!({})))
                .collect(),
            number_of_fragments: 0,
            pre_tags: vec![pre_tag.to_string()],
            post_tags: vec![post_tag.to_string()],
        }
    }
}

/// The accumulating search request document.
///
/// Members that are `None` are omitted when serialized. The `query` member always renders as a
/// `bool` query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryDoc {
    /// The root boolean query.
    #[serde(serialize_with = "serialize_bool")]
    pub query: BoolExpr,
    /// Sort clauses, in priority order. `Some(vec![])` renders an explicit empty sort.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<SortClause>>,
    /// Number of hits to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Offset of the first hit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    /// Stored fields to return for each hit.
    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<Vec<String>>,
    /// Highlight request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Highlight>,
    /// Whether to compute scores while sorting on other fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_scores: Option<bool>,
    /// Top-level approximate nearest-neighbour section (Elasticsearch).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub knn: Option<Value>,
    /// Aggregations keyed by name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<Map<String, Value>>,
}

/// Serializes the root query as `{"bool": {...}}`, empty when no clause was added.
fn serialize_bool<S: Serializer>(query: &BoolExpr, serializer: S) -> Result<S::Ok, S::Error> {
    query
        .to_bool_query()
        .unwrap_or_else(|| json!({ "bool": query.to_h() }))
        .serialize(serializer)
}

impl QueryDoc {
    /// Creates a document around an existing boolean query.
    pub fn with_query(query: BoolExpr) -> Self {
        Self {
            query,
            ..Self::default()
        }
    }

    /// Appends a clause to `query.bool.filter`.
    ///
    /// Blank clauses are dropped, so filter helpers can return `None` when they have nothing to
    /// contribute.
    pub fn add_filter(&mut self, clause: impl Into<Option<Value>>) {
        self.query.add(Occur::Filter, clause);
    }

    /// Appends a clause to `query.bool.must_not`.
    pub fn add_must_not(&mut self, clause: impl Into<Option<Value>>) {
        self.query.add(Occur::MustNot, clause);
    }

    /// Appends a clause to `query.bool.should`.
    pub fn add_should(&mut self, clause: impl Into<Option<Value>>) {
        self.query.add(Occur::Should, clause);
    }

    /// Returns the filter clauses accumulated so far.
    pub fn filters(&self) -> &[Value] {
        &self.query.filter
    }

    /// Renders the document as a JSON value.
    pub fn to_json(&self) -> Value {
        // Every member serializes to plain JSON, so this cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
