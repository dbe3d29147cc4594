use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use serde_json::Value;
use tracing::{debug, info};

use crate::analyzer::{is_indexable, pad, pad_token, Analyzer};
use crate::dictionary::Dictionary;
use crate::schema::Schema;
use crate::value::collect_text;

/// Read-only full-text index: one padded stemmed blob per row plus a
/// global padded-token occurrence table used for scoring.
pub struct FullTextIndex {
    rows: Vec<Arc<str>>,
    word_counts: AHashMap<String, u32>,
}

impl FullTextIndex {
    /// Build the index over every eligible field, or `None` when no field
    /// qualifies: free-text strings (spaced, repeating, high-cardinality)
    /// and all structured fields.
    #[must_use]
    pub fn build(schema: &Schema, analyzer: &Analyzer) -> Option<Self> {
        let mut eligible: Vec<(&str, &crate::dictionary::SchemaField)> = schema
            .fields
            .iter()
            .filter(|(_, field)| {
                field.is_free_text(schema.total_items) || field.kind.is_structured()
            })
            .map(|(name, field)| (name.as_str(), field))
            .collect();
        if eligible.is_empty() {
            return None;
        }
        // fields contribute to each blob in name order so cross-field
        // phrase adjacency is deterministic
        eligible.sort_by_key(|(name, _)| *name);

        let mut row_tokens: Vec<Vec<String>> = vec![Vec::new(); schema.total_items];
        for (name, field) in &eligible {
            debug!(field = %name, "indexing full text");

            // tokenize once per dictionary entry, not once per row
            let entry_tokens: Vec<Vec<String>> = match field.dictionary() {
                Dictionary::String { values, .. } => values
                    .iter()
                    .map(|text| {
                        analyzer
                            .lex_and_stem(text)
                            .into_iter()
                            .filter(|token| is_indexable(token))
                            .collect()
                    })
                    .collect(),
                Dictionary::Structured { values } => values
                    .iter()
                    .map(|encoded| {
                        let mut text = String::new();
                        if let Ok(value) = serde_json::from_str::<Value>(encoded) {
                            collect_text(&value, &mut text);
                        }
                        analyzer
                            .lex_and_stem(&text)
                            .into_iter()
                            .filter(|token| is_indexable(token))
                            .collect()
                    })
                    .collect(),
                _ => continue,
            };

            for (row, tokens) in row_tokens.iter_mut().enumerate() {
                if let Some(entry) = field.row_index(row).and_then(|i| entry_tokens.get(i)) {
                    tokens.extend_from_slice(entry);
                }
            }
        }

        let mut word_counts: AHashMap<String, u32> = AHashMap::new();
        let mut interned: AHashSet<Arc<str>> = AHashSet::new();
        let mut rows: Vec<Arc<str>> = Vec::with_capacity(schema.total_items);

        for tokens in &row_tokens {
            for token in tokens {
                *word_counts.entry(pad_token(token)).or_insert(0) += 1;
            }
            let blob = pad(tokens);
            // byte-identical blobs share one allocation
            let shared = match interned.get(blob.as_str()) {
                Some(existing) => Arc::clone(existing),
                None => {
                    let fresh: Arc<str> = Arc::from(blob.as_str());
                    interned.insert(Arc::clone(&fresh));
                    fresh
                }
            };
            rows.push(shared);
        }

        info!(
            rows = rows.len(),
            terms = word_counts.len(),
            fields = eligible.len(),
            "full-text index built"
        );
        Some(FullTextIndex { rows, word_counts })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Padded blob for a row. Rows that produced no indexable tokens have
    /// no text to search (" " padding only).
    #[inline]
    #[must_use]
    pub fn row_text(&self, row: usize) -> Option<&str> {
        self.rows.get(row).map(|blob| &**blob).filter(|blob| blob.len() > 2)
    }

    /// Global occurrence count for a padded token.
    #[inline]
    #[must_use]
    pub fn occurrences(&self, padded_token: &str) -> u32 {
        self.word_counts.get(padded_token).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text_schema(rows: &[&str]) -> Schema {
        // array-typed columns are unconditionally eligible, which keeps
        // fixtures small (free-text strings need > 100 distinct values)
        let column: Vec<Value> = rows.iter().map(|text| json!([text])).collect();
        let columns = std::collections::HashMap::from([("text".to_string(), column)]);
        Schema::build(columns).expect("schema")
    }

    #[test]
    fn test_blobs_are_padded_stems() {
        let schema = text_schema(&["The quick foxes", "a slow fox"]);
        let index = FullTextIndex::build(&schema, &Analyzer::new()).expect("index");
        assert_eq!(index.row_text(0), Some(" the quick fox "));
        assert_eq!(index.row_text(1), Some(" a slow fox "));
    }

    #[test]
    fn test_word_counts_are_global_occurrences() {
        let schema = text_schema(&["the quick fox", "a slow fox"]);
        let index = FullTextIndex::build(&schema, &Analyzer::new()).expect("index");
        assert_eq!(index.occurrences(" fox "), 2);
        assert_eq!(index.occurrences(" quick "), 1);
        assert_eq!(index.occurrences(" missing "), 0);
    }

    #[test]
    fn test_identical_blobs_share_storage() {
        let schema = text_schema(&["same words here", "other text", "same words here"]);
        let index = FullTextIndex::build(&schema, &Analyzer::new()).expect("index");
        assert!(Arc::ptr_eq(&index.rows[0], &index.rows[2]));
        assert!(!Arc::ptr_eq(&index.rows[0], &index.rows[1]));
    }

    #[test]
    fn test_structured_leaf_extraction() {
        let column = vec![
            json!({"title": "red fox", "meta": {"tags": ["wild", 3]}}),
            json!({"title": "tame cat"}),
        ];
        let columns = std::collections::HashMap::from([("doc".to_string(), column)]);
        let schema = Schema::build(columns).expect("schema");
        let index = FullTextIndex::build(&schema, &Analyzer::new()).expect("index");
        // keys iterate sorted: meta.tags first, then title
        assert_eq!(index.row_text(0), Some(" wild red fox "));
        assert_eq!(index.row_text(1), Some(" tame cat "));
    }

    #[test]
    fn test_no_eligible_field_builds_nothing() {
        let columns = std::collections::HashMap::from([
            ("flag".to_string(), vec![json!(true), json!(false)]),
            ("name".to_string(), vec![json!("a"), json!("b")]),
        ]);
        let schema = Schema::build(columns).expect("schema");
        assert!(FullTextIndex::build(&schema, &Analyzer::new()).is_none());
    }

    #[test]
    fn test_row_with_no_text_has_no_entry() {
        let columns = std::collections::HashMap::from([(
            "tags".to_string(),
            vec![json!(["some words"]), json!(null)],
        )]);
        let schema = Schema::build(columns).expect("schema");
        let index = FullTextIndex::build(&schema, &Analyzer::new()).expect("index");
        assert!(index.row_text(0).is_some());
        assert_eq!(index.row_text(1), None);
    }
}
