//! # siftX Core
//!
//! Core engine for the siftX dataset search service.
//!
//! This crate turns a set of named, equal-length columns of loosely-typed
//! values into a queryable, read-only in-memory index:
//!
//! - [`Schema`] - per-column type inference and dictionary encoding, with
//!   entropy-ranked summary fields
//! - [`FullTextIndex`] - stemmed per-row text blobs over free-text and
//!   structured fields
//! - [`Search`] - filter metadata and the query planner/executor
//! - [`Collection`] - one-shot background build with a readiness gate
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use serde_json::json;
//! use siftx_core::Collection;
//!
//! let columns = HashMap::from([
//!     ("active".to_string(), vec![json!(true), json!(false)]),
//!     ("name".to_string(), vec![json!("Alpha"), json!("Beta")]),
//! ]);
//!
//! let collection = Collection::build(columns).unwrap();
//! collection.wait_ready();
//!
//! let query = vec![("active".to_string(), "true".to_string())];
//! let results = collection.search(&query, 0).unwrap();
//! assert_eq!(results.total, 1);
//! ```

pub mod analyzer;
pub mod collection;
pub mod dictionary;
pub mod error;
pub mod fulltext;
pub mod schema;
pub mod search;
pub mod value;

pub use analyzer::Analyzer;
pub use collection::{Collection, Index};
pub use dictionary::{Dictionary, SchemaField};
pub use error::{Error, Result};
pub use fulltext::FullTextIndex;
pub use schema::Schema;
pub use search::{Search, SearchField, SearchResponse, PAGE_SIZE};
pub use value::{classify, Columns, FieldKind};
