use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::error::Result;
use crate::schema::{check_columns, Schema};
use crate::search::{Search, SearchResponse};
use crate::value::Columns;

/// The fully-built, immutable index: published at most once, then shared
/// read-only by every query.
pub struct Index {
    pub schema: Schema,
    pub search: Search,
}

struct Shared {
    index: Mutex<Option<Arc<Index>>>,
    ready: Condvar,
}

/// Read-only collection facade over a one-shot background build.
///
/// Queries either observe "not yet ready" (`index()` returns `None`) or a
/// fully-built index; a partially-constructed one is never visible.
#[derive(Clone)]
pub struct Collection {
    shared: Arc<Shared>,
}

impl Collection {
    /// Validate the input snapshot and start the build on a background
    /// thread. Column-length mismatches fail fast, before the thread
    /// spawns; queries may be issued immediately and will report
    /// unavailable until the index is published.
    pub fn build(columns: Columns) -> Result<Self> {
        check_columns(&columns)?;

        let shared = Arc::new(Shared {
            index: Mutex::new(None),
            ready: Condvar::new(),
        });

        let worker = Arc::clone(&shared);
        thread::Builder::new()
            .name("index-build".to_string())
            .spawn(move || {
                let started = Instant::now();
                let schema = match Schema::build(columns) {
                    Ok(schema) => schema,
                    Err(err) => {
                        // cannot happen after the pre-check, but the
                        // readiness gate must not be signalled on failure
                        error!(%err, "index build failed");
                        return;
                    }
                };
                let search = Search::build(&schema);
                info!(
                    rows = schema.total_items,
                    fields = schema.fields.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "index built"
                );

                let mut guard = worker.index.lock();
                *guard = Some(Arc::new(Index { schema, search }));
                worker.ready.notify_all();
            })?;

        Ok(Collection { shared })
    }

    /// Build synchronously; mostly useful for tests and tooling.
    pub fn build_blocking(columns: Columns) -> Result<Self> {
        let collection = Collection::build(columns)?;
        collection.wait_ready();
        Ok(collection)
    }

    #[must_use]
    pub fn ready(&self) -> bool {
        self.shared.index.lock().is_some()
    }

    /// Block until the index is published.
    pub fn wait_ready(&self) {
        let mut guard = self.shared.index.lock();
        while guard.is_none() {
            self.shared.ready.wait(&mut guard);
        }
    }

    /// The published index, or `None` while the build is still running.
    #[must_use]
    pub fn index(&self) -> Option<Arc<Index>> {
        self.shared.index.lock().clone()
    }

    #[must_use]
    pub fn total_items(&self) -> Option<usize> {
        self.index().map(|index| index.schema.total_items)
    }

    #[must_use]
    pub fn describe_schema(&self) -> Option<Value> {
        self.index().map(|index| index.schema.describe())
    }

    #[must_use]
    pub fn describe_search(&self) -> Option<Value> {
        self.index().map(|index| index.search.describe())
    }

    /// Execute a query, or `None` while the build is still running.
    #[must_use]
    pub fn search(&self, query: &[(String, String)], offset: usize) -> Option<SearchResponse> {
        self.index()
            .map(|index| index.search.execute(&index.schema, query, offset))
    }

    /// Full row projection, or `None` while building / out of range.
    #[must_use]
    pub fn get_item(&self, row: usize) -> Option<Map<String, Value>> {
        self.index().and_then(|index| index.schema.get_item(row))
    }
}
