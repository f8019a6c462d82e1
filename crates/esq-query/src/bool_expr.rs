//! Boolean query expressions.
//!
//! A [`BoolExpr`] is the mutable accumulator behind every `bool` query the builders emit. Stages
//! push clauses into one of four occurrence lists and the expression is projected to JSON only
//! when the document is rendered.

use std::{fmt, str::FromStr};

use serde_json::{Map, Value, json};

use crate::QueryError;

/// The occurrence list a clause belongs to inside a `bool` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occur {
    /// Clause must match and contributes to scoring.
    Must,
    /// Clause must not match.
    MustNot,
    /// Clause should match; see `minimum_should_match`.
    Should,
    /// Clause must match and does not contribute to scoring.
    Filter,
}

impl Occur {
    /// Returns the JSON key used for this occurrence.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Must => "must",
            Self::MustNot => "must_not",
            Self::Should => "should",
            Self::Filter => "filter",
        }
    }
}

impl fmt::Display for Occur {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Occur {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "must" => Ok(Self::Must),
            "must_not" => Ok(Self::MustNot),
            "should" => Ok(Self::Should),
            "filter" => Ok(Self::Filter),
            other => Err(QueryError::UnknownOccur(other.to_string())),
        }
    }
}

/// A boolean query under construction.
///
/// A fresh expression has four empty clause lists and no `minimum_should_match`. `Clone` yields
/// an independent deep copy, which builders rely on when a shared base filter is specialized
/// into divergent branches.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolExpr {
    /// Clauses that must match (scored).
    pub must: Vec<Value>,
    /// Clauses that must not match.
    pub must_not: Vec<Value>,
    /// Optional clauses.
    pub should: Vec<Value>,
    /// Clauses that must match (unscored).
    pub filter: Vec<Value>,
    /// Minimum number of `should` clauses that must match.
    pub minimum_should_match: Option<u32>,
    /// Optional `_name` label for the whole expression.
    pub name: Option<String>,
}

impl BoolExpr {
    /// Creates an empty expression.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty expression labelled with `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Returns the clause list for `occur`.
    pub fn clauses(&self, occur: Occur) -> &[Value] {
        match occur {
            Occur::Must => &self.must,
            Occur::MustNot => &self.must_not,
            Occur::Should => &self.should,
            Occur::Filter => &self.filter,
        }
    }

    /// Returns the mutable clause list for `occur`.
    pub fn clauses_mut(&mut self, occur: Occur) -> &mut Vec<Value> {
        match occur {
            Occur::Must => &mut self.must,
            Occur::MustNot => &mut self.must_not,
            Occur::Should => &mut self.should,
            Occur::Filter => &mut self.filter,
        }
    }

    /// Appends `clause` to the `occur` list.
    ///
    /// Blank clauses (`None`, `null`, `{}`, `[]`) are dropped. A JSON array is flattened so that
    /// helpers returning several clauses can be added in one call.
    pub fn add(&mut self, occur: Occur, clause: impl Into<Option<Value>>) {
        let Some(clause) = clause.into() else {
            return;
        };
        if is_blank(&clause) {
            return;
        }
        let list = self.clauses_mut(occur);
        match clause {
            Value::Array(items) => list.extend(items.into_iter().filter(|c| !is_blank(c))),
            other => list.push(other),
        }
    }

    /// Appends every clause in `clauses` to `should`.
    pub fn extend_should(&mut self, clauses: impl IntoIterator<Item = Value>) {
        for clause in clauses {
            self.add(Occur::Should, clause);
        }
    }

    /// Appends every clause of `other` to this expression.
    ///
    /// `other.minimum_should_match` replaces ours only when it is set.
    pub fn merge(&mut self, other: Self) {
        self.must.extend(other.must);
        self.must_not.extend(other.must_not);
        self.should.extend(other.should);
        self.filter.extend(other.filter);
        if other.minimum_should_match.is_some() {
            self.minimum_should_match = other.minimum_should_match;
        }
    }

    /// Projects the expression to a JSON object, dropping blank fields.
    pub fn to_h(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if let Some(name) = &self.name {
            map.insert("_name".into(), Value::String(name.clone()));
        }
        for occur in [Occur::Must, Occur::MustNot, Occur::Should, Occur::Filter] {
            let clauses = self.clauses(occur);
            if !clauses.is_empty() {
                map.insert(occur.as_str().into(), Value::Array(clauses.to_vec()));
            }
        }
        if let Some(msm) = self.minimum_should_match {
            map.insert("minimum_should_match".into(), json!(msm));
        }
        map
    }

    /// Returns true when no clause list is populated and `minimum_should_match` is unset.
    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.must_not.is_empty()
            && self.should.is_empty()
            && self.filter.is_empty()
            && self.minimum_should_match.is_none()
    }

    /// Renders `{"bool": ...}`, or `None` when the expression is empty.
    ///
    /// When `should` is populated and `minimum_should_match` is unset it defaults to 1, so that
    /// optional clauses are not silently ignored next to `filter` clauses.
    pub fn to_bool_query(&self) -> Option<Value> {
        if self.is_empty() {
            return None;
        }
        let mut map = self.to_h();
        if !self.should.is_empty() && self.minimum_should_match.is_none() {
            map.insert("minimum_should_match".into(), json!(1));
        }
        Some(json!({ "bool": map }))
    }
}

/// Returns true for values the builders treat as "no clause".
fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}
