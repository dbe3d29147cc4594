use std::cmp::Ordering;
use std::collections::HashMap;

use parking_lot::Mutex;
use rayon::prelude::*;
use serde_json::{json, Map, Value};
use tracing::{debug, info};

use crate::dictionary::SchemaField;
use crate::error::{Error, Result};
use crate::value::{classify, Columns, FieldKind};

/// Every column must be this long; the loader guarantees it, the builder
/// re-checks and fails fast.
pub(crate) fn check_columns(columns: &Columns) -> Result<usize> {
    let total = columns.values().next().map_or(0, Vec::len);
    for (name, column) in columns {
        if column.len() != total {
            return Err(Error::ColumnLength {
                field: name.clone(),
                expected: total,
                actual: column.len(),
            });
        }
    }
    Ok(total)
}

/// Dictionary-encoded dataset schema. Built once, read-only afterwards.
pub struct Schema {
    pub total_items: usize,
    pub fields: HashMap<String, SchemaField>,
    /// Boolean and string field names, descending by entropy (ties break
    /// on field name). Drives summary projections and search metadata.
    pub summary_fields: Vec<String>,
}

impl Schema {
    /// Encode every column. Columns are independent, so encoding fans out
    /// across the thread pool; only registration into the shared field map
    /// is serialized. All-null columns are dropped.
    pub fn build(columns: Columns) -> Result<Self> {
        let total_items = check_columns(&columns)?;

        let registry: Mutex<(HashMap<String, SchemaField>, Vec<String>)> =
            Mutex::new((HashMap::with_capacity(columns.len()), Vec::new()));

        columns.into_par_iter().for_each(|(name, column)| {
            let Some(kind) = classify(&column) else {
                debug!(field = %name, "all-null column dropped");
                return;
            };
            let field = match kind {
                FieldKind::Boolean => SchemaField::boolean(&column),
                FieldKind::Number => SchemaField::number(&column),
                FieldKind::String => SchemaField::string(&column),
                FieldKind::Array | FieldKind::Object => SchemaField::structured(kind, &column),
            };
            debug!(
                field = %name,
                kind = kind.as_str(),
                entropy = field.entropy,
                distinct = field.distinct_count(),
                "column encoded"
            );

            let summary = matches!(kind, FieldKind::Boolean | FieldKind::String);
            let mut guard = registry.lock();
            if summary {
                guard.1.push(name.clone());
            }
            guard.0.insert(name, field);
        });

        let (fields, mut summary_fields) = registry.into_inner();
        summary_fields.sort_by(|a, b| {
            let ea = fields.get(a).map_or(0.0, |field| field.entropy);
            let eb = fields.get(b).map_or(0.0, |field| field.entropy);
            eb.partial_cmp(&ea)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(b))
        });

        info!(
            rows = total_items,
            fields = fields.len(),
            summary = summary_fields.len(),
            "schema built"
        );
        Ok(Schema {
            total_items,
            fields,
            summary_fields,
        })
    }

    /// Full row projection. Null cells are omitted (booleans are always
    /// present since null coerced to false at encode time). `None` when
    /// the row id is out of range.
    #[must_use]
    pub fn get_item(&self, row: usize) -> Option<Map<String, Value>> {
        if row >= self.total_items {
            return None;
        }
        let mut item = Map::new();
        for (name, field) in &self.fields {
            if let Some(value) = field.value(row) {
                item.insert(name.clone(), value);
            }
        }
        Some(item)
    }

    /// Compact projection over the top `max_fields + 1` summary fields,
    /// used to keep search payloads small.
    #[must_use]
    pub fn get_summary(&self, row: usize, max_fields: usize) -> Map<String, Value> {
        let mut item = Map::new();
        for name in self.summary_fields.iter().take(max_fields + 1) {
            if let Some(value) = self.fields.get(name).and_then(|field| field.value(row)) {
                item.insert(name.clone(), value);
            }
        }
        item
    }

    /// Introspection document for the schema endpoint.
    #[must_use]
    pub fn describe(&self) -> Value {
        let mut properties = Map::new();
        for (name, field) in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".to_string(), json!(field.kind.as_str()));
            prop.insert("entropy".to_string(), json!(field.entropy));
            if let (Some(min), Some(max)) = (field.min_value(), field.max_value()) {
                prop.insert("minValue".to_string(), json!(min));
                prop.insert("maxValue".to_string(), json!(max));
            }
            if field.is_closed_enum(self.total_items) {
                if let Some(values) = field.enumerated_values() {
                    prop.insert("enum".to_string(), Value::Array(values));
                }
            }
            properties.insert(name.clone(), Value::Object(prop));
        }
        json!({ "type": "object", "properties": properties })
    }
}
