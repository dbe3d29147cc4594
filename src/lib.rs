//! # siftX
//!
//! A read-only in-memory search index over loosely-typed columnar
//! datasets, served over REST.
//!
//! siftX loads a CSV / JSON / JSON-lines file, infers a per-column type,
//! dictionary-encodes every column, ranks fields by information content,
//! derives a full-text index over free-text and structured fields, and
//! answers multi-field filtered, ranked, paginated queries.
//!
//! ## Quick Start
//!
//! ### As a Server
//!
//! ```bash
//! siftx --datafile items.jsonl --address 0.0.0.0:8080
//! ```
//!
//! ### As a Library
//!
//! ```rust,no_run
//! use siftx::prelude::*;
//!
//! let columns = siftx::load("items.jsonl").unwrap();
//! let collection = Collection::build(columns).unwrap();
//! collection.wait_ready();
//!
//! let query = vec![("search".to_string(), "quick fox".to_string())];
//! let results = collection.search(&query, 0).unwrap();
//! println!("{} matching rows", results.total);
//! ```
//!
//! ## Crate Structure
//!
//! siftX is composed of several crates:
//!
//! - `siftx-core` - schema inference, dictionary encoding, full-text
//!   indexing, query execution
//! - `siftx-format` - CSV / JSON / JSON-lines loaders
//! - `siftx-api` - the actix-web REST layer

// Re-export core types
pub use siftx_core::{
    Analyzer, Collection, Columns, Dictionary, Error, FieldKind, FullTextIndex, Index, Result,
    Schema, SchemaField, Search, SearchField, SearchResponse, PAGE_SIZE,
};

// Re-export loaders
pub use siftx_format::load;

// Re-export API
pub use siftx_api::RestApi;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        Collection, Columns, Error, FieldKind, Index, Result, Schema, Search, SearchResponse,
        RestApi,
    };
}
