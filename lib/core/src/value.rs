use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;

/// Raw dataset input: column name to cell values, all columns equal length.
pub type Columns = HashMap<String, Vec<Value>>;

/// Inferred shape of a column, taken from its first non-null value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Boolean,
    Number,
    String,
    Array,
    Object,
}

impl FieldKind {
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Boolean => "boolean",
            FieldKind::Number => "number",
            FieldKind::String => "string",
            FieldKind::Array => "array",
            FieldKind::Object => "object",
        }
    }

    #[inline]
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, FieldKind::Array | FieldKind::Object)
    }
}

/// Classify a column by its first non-null value. Returns `None` for an
/// all-null column, which is dropped from the schema entirely.
///
/// Columns are assumed homogeneous after the first non-null value; mixed
/// columns are not validated.
#[must_use]
pub fn classify(column: &[Value]) -> Option<FieldKind> {
    for value in column {
        match value {
            Value::Null => continue,
            Value::Bool(_) => return Some(FieldKind::Boolean),
            Value::Number(_) => return Some(FieldKind::Number),
            Value::String(_) => return Some(FieldKind::String),
            Value::Array(_) => return Some(FieldKind::Array),
            Value::Object(_) => return Some(FieldKind::Object),
        }
    }
    None
}

/// Recursively collect every string leaf of a structured value into `out`,
/// space-separated. Non-string leaves are ignored. Input is tree-shaped
/// JSON, so structural recursion terminates.
pub fn collect_text(value: &Value, out: &mut String) {
    match value {
        Value::String(text) => {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(text);
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Value::Object(map) => {
            for item in map.values() {
                collect_text(item, out);
            }
        }
        _ => {}
    }
}
