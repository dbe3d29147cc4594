//! # siftX Format
//!
//! File-format loaders for the siftX dataset search service.
//!
//! Each loader produces the raw column mapping the core engine consumes:
//! `fieldName -> Vec<Value>`, every column the same length. Missing cells
//! become nulls so that invariant always holds.
//!
//! - `.csv` / `.tsv` - header row names the columns; cells stay strings
//! - `.json` - a top-level array of objects
//! - `.jsonl` / anything else - one JSON object per line

use std::path::Path;

use thiserror::Error;

mod csv;
mod json;

pub use crate::csv::load_csv;
pub use crate::json::{load_json, load_json_lines};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load a dataset, dispatching on the file extension. Unknown extensions
/// are treated as JSON-lines.
pub fn load(path: impl AsRef<Path>) -> Result<siftx_core::Columns> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("")
        .to_ascii_lowercase();

    tracing::info!(file = %path.display(), format = %extension, "loading dataset");

    match extension.as_str() {
        "csv" => load_csv(path, b','),
        "tsv" => load_csv(path, b'\t'),
        "json" => load_json(path),
        _ => load_json_lines(path),
    }
}
