use std::collections::BTreeSet;

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde_json::{Number, Value};

use crate::value::FieldKind;

/// Row index value marking a null/absent cell.
pub const NULL_INDEX: i32 = -1;

/// A string field whose distinct-value fraction and count both fall at or
/// below these thresholds is a closed enumeration; one above both is
/// free-text-indexable (when it also has spaces and repeats).
pub const ENUMERATE_THRESHOLD_FRACTION: f64 = 0.01;
pub const ENUMERATE_THRESHOLD_COUNT: usize = 100;

/// Ordered table of distinct values for one field.
#[derive(Debug, Clone)]
pub enum Dictionary {
    /// Fixed two-entry table: index 0 = false, index 1 = true.
    Boolean,
    /// Ascending distinct finite values.
    Number { values: Vec<f64>, min: f64, max: f64 },
    /// Sorted distinct non-empty values.
    String {
        values: Vec<String>,
        has_space: bool,
        all_unique: bool,
    },
    /// Distinct canonical JSON forms, decoded back to values on access.
    Structured { values: Vec<String> },
}

/// One dictionary-encoded column: the distinct-value table plus a per-row
/// index array (`-1` = null, except booleans which coerce null to false).
#[derive(Debug, Clone)]
pub struct SchemaField {
    pub kind: FieldKind,
    pub entropy: f64,
    dictionary: Dictionary,
    rows: Vec<i32>,
}

fn entropy_term(p: f64) -> f64 {
    // convention: 0 * log2(0) = 0
    if p > 0.0 {
        -p * p.log2()
    } else {
        0.0
    }
}

impl SchemaField {
    /// Encode a boolean column. Nulls coerce to false, so every row has a
    /// value. Entropy is the Shannon entropy of the true/false split.
    #[must_use]
    pub fn boolean(column: &[Value]) -> Self {
        let mut trues = 0usize;
        let rows: Vec<i32> = column
            .iter()
            .map(|value| match value {
                Value::Bool(true) => {
                    trues += 1;
                    1
                }
                _ => 0,
            })
            .collect();

        let total = rows.len().max(1) as f64;
        let p = trues as f64 / total;
        let entropy = entropy_term(p) + entropy_term(1.0 - p);

        SchemaField {
            kind: FieldKind::Boolean,
            entropy,
            dictionary: Dictionary::Boolean,
            rows,
        }
    }

    /// Encode a number column: ascending distinct finite values, null (or
    /// any non-number cell) mapped to `-1`. Numbers are excluded from
    /// entropy ranking, so entropy stays 0.
    #[must_use]
    pub fn number(column: &[Value]) -> Self {
        let mut distinct: BTreeSet<OrderedFloat<f64>> = BTreeSet::new();
        for value in column {
            if let Value::Number(number) = value {
                if let Some(v) = number.as_f64() {
                    if v.is_finite() {
                        distinct.insert(OrderedFloat(v));
                    }
                }
            }
        }
        let values: Vec<f64> = distinct.into_iter().map(|v| v.into_inner()).collect();
        let min = values.first().copied().unwrap_or(0.0);
        let max = values.last().copied().unwrap_or(0.0);

        let rows: Vec<i32> = column
            .iter()
            .map(|value| match value {
                Value::Number(number) => number
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .and_then(|v| values.binary_search_by(|probe| probe.total_cmp(&v)).ok())
                    .map_or(NULL_INDEX, |i| i as i32),
                _ => NULL_INDEX,
            })
            .collect();

        SchemaField {
            kind: FieldKind::Number,
            entropy: 0.0,
            dictionary: Dictionary::Number { values, min, max },
            rows,
        }
    }

    /// Encode a string column. Empty strings count as null. Entropy is the
    /// value-frequency Shannon entropy normalized by log2(distinct count);
    /// a single-valued column instead scores the presence/absence split so
    /// near-constant columns still rank meaningfully.
    #[must_use]
    pub fn string(column: &[Value]) -> Self {
        let mut counts: AHashMap<&str, u32> = AHashMap::new();
        let mut present = 0u64;
        for value in column {
            if let Value::String(text) = value {
                if !text.is_empty() {
                    *counts.entry(text.as_str()).or_insert(0) += 1;
                    present += 1;
                }
            }
        }

        let has_space = counts.keys().any(|text| text.contains(' '));
        let all_unique = counts.values().all(|&count| count == 1);

        let entropy = if counts.len() > 1 {
            let norm = (counts.len() as f64).log2();
            counts
                .values()
                .map(|&count| entropy_term(count as f64 / present as f64))
                .sum::<f64>()
                / norm
        } else if counts.len() == 1 {
            let total = column.len() as f64;
            let hits = present as f64;
            entropy_term(hits / total) + entropy_term((total - hits) / total)
        } else {
            0.0
        };

        let mut values: Vec<String> = counts.keys().map(|text| (*text).to_string()).collect();
        values.sort_unstable();

        let rows: Vec<i32> = column
            .iter()
            .map(|value| match value {
                Value::String(text) if !text.is_empty() => values
                    .binary_search_by(|probe| probe.as_str().cmp(text.as_str()))
                    .map_or(NULL_INDEX, |i| i as i32),
                _ => NULL_INDEX,
            })
            .collect();

        SchemaField {
            kind: FieldKind::String,
            entropy,
            dictionary: Dictionary::String {
                values,
                has_space,
                all_unique,
            },
            rows,
        }
    }

    /// Encode an array/object column. Values are keyed by their canonical
    /// JSON text (serde_json object maps are ordered, so equal values
    /// serialize identically); the table keeps first-seen order.
    #[must_use]
    pub fn structured(kind: FieldKind, column: &[Value]) -> Self {
        let mut index: AHashMap<String, i32> = AHashMap::new();
        let mut values: Vec<String> = Vec::new();

        let rows: Vec<i32> = column
            .iter()
            .map(|value| {
                if value.is_null() {
                    return NULL_INDEX;
                }
                let encoded = serde_json::to_string(value).unwrap_or_default();
                *index.entry(encoded).or_insert_with_key(|key| {
                    values.push(key.clone());
                    values.len() as i32 - 1
                })
            })
            .collect();

        SchemaField {
            kind,
            entropy: 0.0,
            dictionary: Dictionary::Structured { values },
            rows,
        }
    }

    #[inline]
    #[must_use]
    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    #[inline]
    #[must_use]
    pub fn distinct_count(&self) -> usize {
        match &self.dictionary {
            Dictionary::Boolean => 2,
            Dictionary::Number { values, .. } => values.len(),
            Dictionary::String { values, .. } => values.len(),
            Dictionary::Structured { values } => values.len(),
        }
    }

    /// Dictionary index for a row, `None` for null/absent cells.
    #[inline]
    #[must_use]
    pub fn row_index(&self, row: usize) -> Option<usize> {
        match self.rows.get(row) {
            Some(&index) if index != NULL_INDEX => Some(index as usize),
            _ => None,
        }
    }

    /// Decode the value stored at a row. Booleans always decode; other
    /// kinds return `None` for null cells.
    #[must_use]
    pub fn value(&self, row: usize) -> Option<Value> {
        match &self.dictionary {
            Dictionary::Boolean => self.rows.get(row).map(|&index| Value::Bool(index == 1)),
            Dictionary::Number { values, .. } => self
                .row_index(row)
                .and_then(|index| values.get(index))
                .and_then(|&v| Number::from_f64(v))
                .map(Value::Number),
            Dictionary::String { values, .. } => self
                .row_index(row)
                .and_then(|index| values.get(index))
                .map(|text| Value::String(text.clone())),
            Dictionary::Structured { values } => self
                .row_index(row)
                .and_then(|index| values.get(index))
                .and_then(|encoded| serde_json::from_str(encoded).ok()),
        }
    }

    #[inline]
    #[must_use]
    pub fn bool_at(&self, row: usize) -> bool {
        self.rows.get(row).is_some_and(|&index| index == 1)
    }

    #[inline]
    #[must_use]
    pub fn number_at(&self, row: usize) -> Option<f64> {
        match &self.dictionary {
            Dictionary::Number { values, .. } => {
                self.row_index(row).and_then(|index| values.get(index)).copied()
            }
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn string_at(&self, row: usize) -> Option<&str> {
        match &self.dictionary {
            Dictionary::String { values, .. } => self
                .row_index(row)
                .and_then(|index| values.get(index))
                .map(String::as_str),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn min_value(&self) -> Option<f64> {
        match &self.dictionary {
            Dictionary::Number { min, .. } => Some(*min),
            _ => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn max_value(&self) -> Option<f64> {
        match &self.dictionary {
            Dictionary::Number { max, .. } => Some(*max),
            _ => None,
        }
    }

    /// A closed enumeration advertises its full value list for exact-match
    /// filtering.
    #[must_use]
    pub fn is_closed_enum(&self, total_items: usize) -> bool {
        match &self.dictionary {
            Dictionary::String { values, .. } => {
                let fraction = values.len() as f64 / total_items.max(1) as f64;
                fraction <= ENUMERATE_THRESHOLD_FRACTION
                    && values.len() <= ENUMERATE_THRESHOLD_COUNT
            }
            _ => false,
        }
    }

    /// Genuinely free text: spaced, repeating, and too high-cardinality to
    /// enumerate. Such fields feed the full-text index.
    #[must_use]
    pub fn is_free_text(&self, total_items: usize) -> bool {
        match &self.dictionary {
            Dictionary::String {
                values,
                has_space,
                all_unique,
            } => {
                let fraction = values.len() as f64 / total_items.max(1) as f64;
                *has_space
                    && !*all_unique
                    && fraction > ENUMERATE_THRESHOLD_FRACTION
                    && values.len() > ENUMERATE_THRESHOLD_COUNT
            }
            _ => false,
        }
    }

    /// The dictionary as decoded values, for closed-enumeration metadata.
    #[must_use]
    pub fn enumerated_values(&self) -> Option<Vec<Value>> {
        match &self.dictionary {
            Dictionary::String { values, .. } => Some(
                values
                    .iter()
                    .map(|text| Value::String(text.clone()))
                    .collect(),
            ),
            _ => None,
        }
    }
}
