//! Mapping raw search responses back to records.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ClientError, aggregations::LABELS_AGGREGATION, pagination::Cursor};

/// Primary key read from each hit when none is configured.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// The useful parts of a search response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResults {
    /// Record ids in relevance (or requested sort) order.
    pub ids: Vec<String>,
    /// Highlighted fragments per record id.
    pub highlights: BTreeMap<String, Map<String, Value>>,
    /// Total number of matching documents.
    pub total: u64,
    /// Sort values of the last hit, for fetching the next page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Cursor>,
    /// Label aggregation buckets, if requested.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<LabelBucket>,
}

/// One bucket of the label aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LabelBucket {
    /// Label id.
    pub key: u64,
    /// Matching documents carrying the label.
    pub doc_count: u64,
}

impl SearchResults {
    /// Orders externally loaded `records` by hit order.
    ///
    /// Records without a matching hit are dropped.
    pub fn map_records<T, F>(&self, records: Vec<T>, key: F) -> Vec<T>
    where
        F: Fn(&T) -> String,
    {
        let position: HashMap<&str, usize> = self
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        let mut ranked: Vec<(usize, T)> = records
            .into_iter()
            .filter_map(|record| {
                let rank = position.get(key(&record).as_str()).copied()?;
                Some((rank, record))
            })
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);
        ranked.into_iter().map(|(_, record)| record).collect()
    }

    /// Reverses hit order, for pages fetched backwards.
    pub(crate) fn reverse(&mut self) {
        self.ids.reverse();
    }
}

/// Response body as returned by the engine.
#[derive(Deserialize)]
struct RawResponse {
    /// The hits section.
    hits: RawHits,
    /// Aggregation results keyed by name.
    #[serde(default)]
    aggregations: HashMap<String, RawAggregation>,
}

/// The `hits` section.
#[derive(Deserialize)]
struct RawHits {
    /// Total count, as a number or `{value, relation}`.
    #[serde(default)]
    total: Option<RawTotal>,
    /// The hits themselves.
    #[serde(default)]
    hits: Vec<RawHit>,
}

/// Either form of `hits.total`.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTotal {
    /// Legacy plain count.
    Count(u64),
    /// Count object.
    Object {
        /// The count.
        value: u64,
    },
}

/// One hit.
#[derive(Deserialize)]
struct RawHit {
    /// Engine document id.
    #[serde(rename = "_id", default)]
    id: Option<Value>,
    /// Stored fields.
    #[serde(rename = "_source", default)]
    source: Map<String, Value>,
    /// Highlighted fragments.
    #[serde(default)]
    highlight: Option<Map<String, Value>>,
    /// Sort values.
    #[serde(default)]
    sort: Vec<Value>,
}

/// A bucket aggregation.
#[derive(Deserialize)]
struct RawAggregation {
    /// Buckets in engine order.
    #[serde(default)]
    buckets: Vec<LabelBucket>,
}

/// Extracts ids, highlights, totals and cursors from raw responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMapper {
    /// Field of `_source` identifying the record.
    primary_key: String,
}

impl Default for ResponseMapper {
    fn default() -> Self {
        Self::new(DEFAULT_PRIMARY_KEY)
    }
}

impl ResponseMapper {
    /// Creates a mapper reading record ids from `primary_key`.
    pub fn new(primary_key: impl Into<String>) -> Self {
        Self {
            primary_key: primary_key.into(),
        }
    }

    /// Maps a raw response.
    ///
    /// Ids come from the primary key in `_source`, falling back to `_id`. Hits with neither are
    /// skipped.
    pub fn map(&self, response: &Value) -> Result<SearchResults, ClientError> {
        let raw = RawResponse::deserialize(response)
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        let mut results = SearchResults {
            total: match raw.hits.total {
                Some(RawTotal::Count(count) | RawTotal::Object { value: count }) => count,
                None => raw.hits.hits.len() as u64,
            },
            cursor: raw
                .hits
                .hits
                .last()
                .and_then(|hit| Cursor::from_sort_values(&hit.sort)),
            ..SearchResults::default()
        };

        for hit in raw.hits.hits {
            let Some(id) = hit.source.get(&self.primary_key).or(hit.id.as_ref()).and_then(id_string)
            else {
                continue;
            };
            if let Some(highlight) = hit.highlight {
                results.highlights.insert(id.clone(), highlight);
            }
            results.ids.push(id);
        }

        let mut aggregations = raw.aggregations;
        if let Some(labels) = aggregations.remove(LABELS_AGGREGATION) {
            results.labels = labels.buckets;
        }
        Ok(results)
    }
}

/// Renders an id value as a map key.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
