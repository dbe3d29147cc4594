use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;
use siftx_core::Columns;
use tracing::warn;

use crate::Result;

/// Load a top-level JSON array of objects.
pub fn load_json(path: &Path) -> Result<Columns> {
    let file = File::open(path)?;
    let items: Vec<Value> = serde_json::from_reader(BufReader::new(file))?;
    Ok(columns_from_records(keep_objects(items)))
}

/// Load JSON-lines: one object per line. Blank lines are skipped,
/// unparsable lines are skipped with a warning.
pub fn load_json_lines(path: &Path) -> Result<Columns> {
    let file = File::open(path)?;
    let mut items: Vec<Value> = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.len() < 2 {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(value) => items.push(value),
            Err(err) => warn!(%err, "line skipped"),
        }
    }
    Ok(columns_from_records(keep_objects(items)))
}

fn keep_objects(items: Vec<Value>) -> Vec<Value> {
    items
        .into_iter()
        .filter(|item| {
            let keep = item.is_object();
            if !keep {
                warn!("non-object record skipped");
            }
            keep
        })
        .collect()
}

/// Union every record's keys into the column set, null-filling cells a
/// record is missing so all columns end up the same length.
fn columns_from_records(records: Vec<Value>) -> Columns {
    let mut head: BTreeSet<String> = BTreeSet::new();
    for record in &records {
        if let Value::Object(map) = record {
            for key in map.keys() {
                if !head.contains(key) {
                    head.insert(key.clone());
                }
            }
        }
    }

    let mut columns: Columns = head
        .iter()
        .map(|key| (key.clone(), Vec::with_capacity(records.len())))
        .collect();

    for record in &records {
        let Value::Object(map) = record else {
            continue;
        };
        for key in &head {
            if let Some(column) = columns.get_mut(key) {
                column.push(map.get(key).cloned().unwrap_or(Value::Null));
            }
        }
    }
    columns
}
