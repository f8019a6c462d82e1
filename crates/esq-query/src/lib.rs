//! Query DSL value types for esq.
//!
//! This crate holds the building blocks every query builder works with:
//!
//! - [`BoolExpr`]: a mutable boolean query under construction
//! - [`QueryDoc`]: the accumulating search request document
//! - [`NameScope`]: rendering of `_name` labels attached to clauses
//! - [`text`]: classification of raw query strings (IID lookups, advanced syntax)
//!
//! None of these types know about authorization or document types; they only describe the
//! shape of an Elasticsearch/OpenSearch request body.

#![warn(missing_docs)]

mod bool_expr;
mod doc;
mod error;
mod names;
pub mod text;

pub use bool_expr::{BoolExpr, Occur};
pub use doc::{Highlight, QueryDoc, SortClause, SortOrder};
pub use error::QueryError;
pub use names::NameScope;
