use std::cmp::Ordering;
use std::collections::HashMap;

use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::analyzer::{is_indexable, pad, pad_token, Analyzer};
use crate::dictionary::SchemaField;
use crate::fulltext::FullTextIndex;
use crate::schema::Schema;
use crate::value::FieldKind;

/// Fixed result page size.
pub const PAGE_SIZE: usize = 20;
/// Search metadata covers this many top entropy-ranked summary fields.
const SEARCH_FIELD_LIMIT: usize = 5;
/// Result rows project this many summary fields.
const RESULT_SUMMARY_FIELDS: usize = 9;
/// Above this many indexed rows, full scans serialize behind one lock to
/// bound peak concurrent CPU on very large corpora.
const SCAN_LOCK_THRESHOLD: usize = 1_000_000;

/// Public per-field query metadata.
#[derive(Debug, Clone, Serialize)]
pub struct SearchField {
    pub entropy: f64,
    pub filters: Vec<&'static str>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enumerated: Option<Vec<Value>>,
    #[serde(rename = "minValue", skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,
    #[serde(rename = "maxValue", skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,
}

/// One page of query results.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub results: Vec<Map<String, Value>>,
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    row: usize,
    score: f64,
}

struct ParsedQuery {
    present: Vec<String>,
    phrases: Vec<String>,
    absent: Vec<String>,
}

/// Query planner/executor over an immutable schema + full-text index.
pub struct Search {
    pub fields: HashMap<String, SearchField>,
    text: Option<FullTextIndex>,
    analyzer: Analyzer,
    scan_lock: Mutex<()>,
}

impl Search {
    /// Build query metadata: the top entropy-ranked summary fields, every
    /// number field (entropy 0, so they order first during execution), and
    /// a synthetic `search` field when the full-text index exists.
    #[must_use]
    pub fn build(schema: &Schema) -> Self {
        let analyzer = Analyzer::new();
        let mut fields = HashMap::new();

        for name in schema.summary_fields.iter().take(SEARCH_FIELD_LIMIT) {
            let Some(field) = schema.fields.get(name) else {
                continue;
            };
            let meta = match field.kind {
                FieldKind::Boolean => SearchField {
                    entropy: field.entropy,
                    filters: vec!["equals"],
                    enumerated: Some(vec![json!(true), json!(false)]),
                    min_value: None,
                    max_value: None,
                },
                FieldKind::String if field.is_closed_enum(schema.total_items) => SearchField {
                    entropy: field.entropy,
                    filters: vec!["within"],
                    enumerated: field.enumerated_values(),
                    min_value: None,
                    max_value: None,
                },
                FieldKind::String => SearchField {
                    entropy: field.entropy,
                    filters: vec!["regex"],
                    enumerated: None,
                    min_value: None,
                    max_value: None,
                },
                _ => continue,
            };
            fields.insert(name.clone(), meta);
        }

        for (name, field) in &schema.fields {
            if field.kind == FieldKind::Number {
                fields.insert(
                    name.clone(),
                    SearchField {
                        entropy: 0.0,
                        filters: vec!["equals", "lessThan", "greaterThan", "notEqual"],
                        enumerated: None,
                        min_value: field.min_value(),
                        max_value: field.max_value(),
                    },
                );
            }
        }

        let text = FullTextIndex::build(schema, &analyzer);
        if text.is_some() {
            fields.insert(
                "search".to_string(),
                SearchField {
                    entropy: 0.0,
                    filters: vec!["search"],
                    enumerated: None,
                    min_value: None,
                    max_value: None,
                },
            );
        }

        Search {
            fields,
            text,
            analyzer,
            scan_lock: Mutex::new(()),
        }
    }

    /// Introspection document for the search-capability endpoint.
    #[must_use]
    pub fn describe(&self) -> Value {
        json!({ "fields": self.fields })
    }

    /// Execute a query: ordered `(key, value)` parameters, values shaped
    /// `[operator:]literal`. Unknown keys are ignored; known keys with bad
    /// operators or literals record an error and do not narrow. Surviving
    /// rows sort by descending score and paginate at [`PAGE_SIZE`].
    #[must_use]
    pub fn execute(
        &self,
        schema: &Schema,
        query: &[(String, String)],
        offset: usize,
    ) -> SearchResponse {
        let _scan_guard = self
            .text
            .as_ref()
            .filter(|text| text.len() > SCAN_LOCK_THRESHOLD)
            .map(|_| self.scan_lock.lock());

        // group parameters for known fields, keeping first-encounter order
        let mut keys: Vec<&str> = Vec::new();
        let mut grouped: HashMap<&str, Vec<&str>> = HashMap::new();
        for (key, value) in query {
            if !self.fields.contains_key(key.as_str()) {
                continue;
            }
            let values = grouped.entry(key.as_str()).or_default();
            if values.is_empty() {
                keys.push(key.as_str());
            }
            values.push(value.as_str());
        }

        // most-skewed fields first shrink the candidate set early; the
        // stable sort keeps encounter order on ties
        keys.sort_by(|a, b| {
            let ea = self.fields.get(*a).map_or(0.0, |meta| meta.entropy);
            let eb = self.fields.get(*b).map_or(0.0, |meta| meta.entropy);
            ea.partial_cmp(&eb).unwrap_or(Ordering::Equal)
        });

        let mut hits: Vec<Hit> = (0..schema.total_items)
            .map(|row| Hit { row, score: 1.0 })
            .collect();
        let mut errors: Vec<String> = Vec::new();

        for key in keys {
            let primary = self
                .fields
                .get(key)
                .and_then(|meta| meta.filters.first().copied())
                .unwrap_or_default();
            let Some(values) = grouped.get(key) else {
                continue;
            };
            for raw in values {
                let (op, literal) = match raw.split_once(':') {
                    Some((op, literal)) => (op, literal),
                    None => (primary, *raw),
                };
                if key == "search" {
                    self.apply_search(&mut hits, key, op, literal, &mut errors);
                } else if let Some(field) = schema.fields.get(key) {
                    match field.kind {
                        FieldKind::Boolean => {
                            apply_boolean(field, &mut hits, key, op, literal, &mut errors);
                        }
                        FieldKind::Number => {
                            apply_number(field, &mut hits, key, op, literal, &mut errors);
                        }
                        FieldKind::String => {
                            apply_string(field, &mut hits, key, op, literal, &mut errors);
                        }
                        _ => {}
                    }
                }
            }
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        let total = hits.len();
        let start = offset.min(total);
        let end = (start + PAGE_SIZE).min(total);
        let results = hits[start..end]
            .iter()
            .map(|hit| {
                let mut item = schema.get_summary(hit.row, RESULT_SUMMARY_FIELDS);
                item.insert("id".to_string(), json!(hit.row));
                item.insert("score".to_string(), json!(hit.score));
                item
            })
            .collect();

        debug!(total, errors = errors.len(), "query executed");
        SearchResponse {
            total,
            limit: PAGE_SIZE,
            offset,
            errors,
            results,
        }
    }

    fn apply_search(
        &self,
        hits: &mut Vec<Hit>,
        key: &str,
        op: &str,
        literal: &str,
        errors: &mut Vec<String>,
    ) {
        if op != "search" {
            errors.push(format!(
                "field '{key}' filter '{op}' value '{literal}' is not supported"
            ));
            return;
        }
        let Some(text) = self.text.as_ref() else {
            return;
        };
        let parsed = self.parse_search_query(literal);

        hits.retain_mut(|hit| {
            let Some(blob) = text.row_text(hit.row) else {
                return false;
            };
            // the padded blob holds token_count + 1 spaces
            let token_count = blob.matches(' ').count().saturating_sub(1).max(1) as f64;
            let mut score = 1.0f64;

            for term in &parsed.present {
                let count = blob.matches(term.as_str()).count();
                if count == 0 {
                    return false;
                }
                let global = f64::from(text.occurrences(term).max(1));
                score *= count as f64 / token_count / global;
            }
            for phrase in &parsed.phrases {
                let count = blob.matches(phrase.as_str()).count();
                if count == 0 {
                    return false;
                }
                score *= count as f64;
            }
            for term in &parsed.absent {
                if blob.contains(term.as_str()) {
                    return false;
                }
            }

            hit.score = score;
            true
        });
    }

    /// Split a query literal into padded present terms, padded phrase
    /// substrings (whose words are also present terms), and `-`-prefixed
    /// absent terms, stemmed exactly like the indexed text.
    fn parse_search_query(&self, raw: &str) -> ParsedQuery {
        let tokens = self.analyzer.lex_and_stem(raw);
        let mut parsed = ParsedQuery {
            present: Vec::new(),
            phrases: Vec::new(),
            absent: Vec::new(),
        };

        let mut i = 0;
        while i < tokens.len() {
            let token = tokens[i].as_str();
            if token == "\"" {
                i += 1;
                let mut words: Vec<String> = Vec::new();
                while i < tokens.len() && tokens[i] != "\"" {
                    if is_indexable(&tokens[i]) {
                        words.push(tokens[i].clone());
                    }
                    i += 1;
                }
                if !words.is_empty() {
                    for word in &words {
                        parsed.present.push(pad_token(word));
                    }
                    parsed.phrases.push(pad(&words));
                }
            } else if token == "-" {
                i += 1;
                if let Some(next) = tokens.get(i) {
                    if is_indexable(next) {
                        parsed.absent.push(pad_token(next));
                    }
                }
            } else if is_indexable(token) {
                parsed.present.push(pad_token(token));
            }
            i += 1;
        }
        parsed
    }
}

fn apply_boolean(
    field: &SchemaField,
    hits: &mut Vec<Hit>,
    key: &str,
    op: &str,
    literal: &str,
    errors: &mut Vec<String>,
) {
    if op != "equals" {
        errors.push(format!(
            "field '{key}' filter '{op}' value '{literal}' is not supported"
        ));
        return;
    }
    match literal {
        "true" => hits.retain(|hit| field.bool_at(hit.row)),
        "false" => hits.retain(|hit| !field.bool_at(hit.row)),
        _ => errors.push(format!("field '{key}' value '{literal}' is not supported")),
    }
}

fn apply_number(
    field: &SchemaField,
    hits: &mut Vec<Hit>,
    key: &str,
    op: &str,
    literal: &str,
    errors: &mut Vec<String>,
) {
    if !matches!(op, "equals" | "notEqual" | "lessThan" | "greaterThan") {
        errors.push(format!(
            "field '{key}' filter '{op}' value '{literal}' is not supported"
        ));
        return;
    }
    let Ok(target) = literal.parse::<f64>() else {
        errors.push(format!("field '{key}' value '{literal}' is not a number"));
        return;
    };
    // a row with no value satisfies no numeric predicate, notEqual included
    match op {
        "equals" => hits.retain(|hit| field.number_at(hit.row).is_some_and(|v| v == target)),
        "notEqual" => hits.retain(|hit| field.number_at(hit.row).is_some_and(|v| v != target)),
        "lessThan" => hits.retain(|hit| field.number_at(hit.row).is_some_and(|v| v < target)),
        _ => hits.retain(|hit| field.number_at(hit.row).is_some_and(|v| v > target)),
    }
}

fn apply_string(
    field: &SchemaField,
    hits: &mut Vec<Hit>,
    key: &str,
    op: &str,
    literal: &str,
    errors: &mut Vec<String>,
) {
    match op {
        "within" => hits.retain(|hit| field.string_at(hit.row) == Some(literal)),
        "regex" => match Regex::new(literal) {
            Ok(pattern) => {
                hits.retain(|hit| field.string_at(hit.row).is_some_and(|s| pattern.is_match(s)));
            }
            Err(_) => {
                errors.push(format!("field '{key}' value '{literal}' is not a valid pattern"));
            }
        },
        _ => errors.push(format!(
            "field '{key}' filter '{op}' value '{literal}' is not supported"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Columns;
    use serde_json::json;

    fn build(pairs: Vec<(&str, Vec<Value>)>) -> (Schema, Search) {
        let columns: Columns = pairs
            .into_iter()
            .map(|(name, column)| (name.to_string(), column))
            .collect();
        let schema = Schema::build(columns).expect("schema");
        let search = Search::build(&schema);
        (schema, search)
    }

    fn query(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Two free-text rows, indexed through an array column (arrays are
    /// always full-text eligible, keeping the fixture small).
    fn fox_corpus() -> (Schema, Search) {
        build(vec![(
            "text",
            vec![json!(["the quick fox"]), json!(["a slow fox"])],
        )])
    }

    #[test]
    fn test_no_filters_returns_first_page() {
        let column: Vec<Value> = (0..25).map(|i| json!(i)).collect();
        let (schema, search) = build(vec![("n", column)]);
        let response = search.execute(&schema, &[], 0);
        assert_eq!(response.total, 25);
        assert_eq!(response.limit, PAGE_SIZE);
        assert_eq!(response.results.len(), PAGE_SIZE);
        assert_eq!(response.results[0]["score"], json!(1.0));
        assert!(response.errors.is_empty());
    }

    #[test]
    fn test_offset_beyond_total_yields_empty_page() {
        let (schema, search) = build(vec![("n", vec![json!(1), json!(2)])]);
        let response = search.execute(&schema, &[], 10);
        assert_eq!(response.total, 2);
        assert!(response.results.is_empty());
        assert!(response.errors.is_empty());
    }

    #[test]
    fn test_boolean_filter_end_to_end() {
        let (schema, search) = build(vec![
            ("active", vec![json!(true), json!(false)]),
            ("name", vec![json!("Alpha"), json!("Beta")]),
        ]);
        let response = search.execute(&schema, &query(&[("active", "true")]), 0);
        assert_eq!(response.total, 1);
        let hit = &response.results[0];
        assert_eq!(hit["id"], json!(0));
        assert_eq!(hit["active"], json!(true));
        assert_eq!(hit["name"], json!("Alpha"));
        assert_eq!(hit["score"], json!(1.0));
    }

    #[test]
    fn test_boolean_bad_literal_records_error_without_narrowing() {
        let (schema, search) = build(vec![("active", vec![json!(true), json!(false)])]);
        let response = search.execute(&schema, &query(&[("active", "maybe")]), 0);
        assert_eq!(response.total, 2);
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].contains("active"));
        assert!(response.errors[0].contains("maybe"));
    }

    #[test]
    fn test_number_filters() {
        let (schema, search) = build(vec![(
            "age",
            vec![json!(10), json!(20), json!(null), json!(30)],
        )]);

        let equals = search.execute(&schema, &query(&[("age", "20")]), 0);
        assert_eq!(equals.total, 1);
        assert_eq!(equals.results[0]["id"], json!(1));

        let less = search.execute(&schema, &query(&[("age", "lessThan:25")]), 0);
        assert_eq!(less.total, 2);

        let greater = search.execute(&schema, &query(&[("age", "greaterThan:15")]), 0);
        assert_eq!(greater.total, 2);

        // the null row satisfies no predicate, notEqual included
        let not_equal = search.execute(&schema, &query(&[("age", "notEqual:10")]), 0);
        assert_eq!(not_equal.total, 2);
    }

    #[test]
    fn test_number_unsupported_filter_records_error() {
        let (schema, search) = build(vec![("age", vec![json!(1), json!(2)])]);
        let response = search.execute(&schema, &query(&[("age", "foo:5")]), 0);
        assert_eq!(response.total, 2, "the predicate does not narrow");
        assert_eq!(response.errors.len(), 1);
        let message = &response.errors[0];
        assert!(message.contains("age"));
        assert!(message.contains("foo"));
        assert!(message.contains('5'));
    }

    #[test]
    fn test_number_unparsable_literal_records_error() {
        let (schema, search) = build(vec![("age", vec![json!(1), json!(2)])]);
        let response = search.execute(&schema, &query(&[("age", "equals:abc")]), 0);
        assert_eq!(response.total, 2);
        assert_eq!(response.errors.len(), 1);
        assert!(response.errors[0].contains("abc"));
    }

    #[test]
    fn test_string_within_is_exact_equality() {
        // closed enumeration: 2 distinct over 200 rows = 1% fraction
        let column: Vec<Value> = (0..200)
            .map(|i| json!(if i % 2 == 0 { "red" } else { "blue" }))
            .collect();
        let (schema, search) = build(vec![("color", column)]);
        assert_eq!(search.fields["color"].filters, vec!["within"]);

        let response = search.execute(&schema, &query(&[("color", "red")]), 0);
        assert_eq!(response.total, 100);

        // regex metacharacters compare literally
        let miss = search.execute(&schema, &query(&[("color", "r.d")]), 0);
        assert_eq!(miss.total, 0);
    }

    #[test]
    fn test_string_regex_filter() {
        let (schema, search) = build(vec![(
            "name",
            vec![json!("alpha"), json!("beta"), json!("gamma")],
        )]);
        assert_eq!(search.fields["name"].filters, vec!["regex"]);

        let response = search.execute(&schema, &query(&[("name", "a$")]), 0);
        assert_eq!(response.total, 3);

        let anchored = search.execute(&schema, &query(&[("name", "^beta$")]), 0);
        assert_eq!(anchored.total, 1);
        assert_eq!(anchored.results[0]["id"], json!(1));
    }

    #[test]
    fn test_invalid_regex_records_error_without_narrowing() {
        let (schema, search) = build(vec![("name", vec![json!("a"), json!("b")])]);
        let response = search.execute(&schema, &query(&[("name", "regex:[")]), 0);
        assert_eq!(response.total, 2);
        assert_eq!(response.errors.len(), 1);
    }

    #[test]
    fn test_unknown_field_silently_ignored() {
        let (schema, search) = build(vec![("name", vec![json!("a"), json!("b")])]);
        let response = search.execute(&schema, &query(&[("bogus", "x")]), 0);
        assert_eq!(response.total, 2);
        assert!(response.errors.is_empty());
    }

    #[test]
    fn test_search_term_exactness() {
        let (schema, search) = fox_corpus();
        let response = search.execute(&schema, &query(&[("search", "quick")]), 0);
        assert_eq!(response.total, 1);
        assert_eq!(response.results[0]["id"], json!(0));
    }

    #[test]
    fn test_search_matches_stemmed_variants() {
        let (schema, search) = fox_corpus();
        // "foxes" stems to "fox", matching both rows
        let response = search.execute(&schema, &query(&[("search", "foxes")]), 0);
        assert_eq!(response.total, 2);
    }

    #[test]
    fn test_search_negation() {
        let (schema, search) = fox_corpus();
        let response = search.execute(&schema, &query(&[("search", "fox -slow")]), 0);
        assert_eq!(response.total, 1);
        assert_eq!(response.results[0]["id"], json!(0));
    }

    #[test]
    fn test_search_phrase_requires_adjacency() {
        let (schema, search) = build(vec![(
            "text",
            vec![json!(["the quick fox"]), json!(["fox turns quick"])],
        )]);

        // unquoted: both words present in both rows
        let loose = search.execute(&schema, &query(&[("search", "quick fox")]), 0);
        assert_eq!(loose.total, 2);

        // quoted: contiguous only in row 0
        let phrase = search.execute(&schema, &query(&[("search", "\"quick fox\"")]), 0);
        assert_eq!(phrase.total, 1);
        assert_eq!(phrase.results[0]["id"], json!(0));
    }

    #[test]
    fn test_search_scoring_prefers_denser_rows() {
        let (schema, search) = build(vec![(
            "text",
            vec![json!(["fox alpha fox"]), json!(["fox beta gamma delta"])],
        )]);
        let response = search.execute(&schema, &query(&[("search", "fox")]), 0);
        assert_eq!(response.total, 2);
        assert_eq!(response.results[0]["id"], json!(0), "two hits in three tokens wins");
        let top: f64 = response.results[0]["score"].as_f64().expect("score");
        let bottom: f64 = response.results[1]["score"].as_f64().expect("score");
        // row 0: 2 occurrences / 3 tokens / 3 global; row 1: 1 / 4 / 3
        assert!((top - 2.0 / 9.0).abs() < 1e-12);
        assert!((bottom - 1.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_search_rows_without_text_are_dropped() {
        let (schema, search) = build(vec![(
            "text",
            vec![json!(["some words"]), json!(null)],
        )])
        ;
        let response = search.execute(&schema, &query(&[("search", "words")]), 0);
        assert_eq!(response.total, 1);
        assert_eq!(response.results[0]["id"], json!(0));
    }

    #[test]
    fn test_equal_scores_keep_row_order() {
        let column: Vec<Value> = (0..5).map(|i| json!(i)).collect();
        let (schema, search) = build(vec![("n", column)]);
        let response = search.execute(&schema, &[], 0);
        let ids: Vec<u64> = response
            .results
            .iter()
            .map(|hit| hit["id"].as_u64().expect("id"))
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_metadata_advertises_top_fields_numbers_and_search() {
        let (_, search) = build(vec![
            ("active", vec![json!(true), json!(false)]),
            ("age", vec![json!(1), json!(2)]),
            ("text", vec![json!(["a b"]), json!(["c d"])]),
        ]);
        assert_eq!(search.fields["active"].filters, vec!["equals"]);
        assert_eq!(
            search.fields["age"].filters,
            vec!["equals", "lessThan", "greaterThan", "notEqual"]
        );
        assert_eq!(search.fields["age"].min_value, Some(1.0));
        assert_eq!(search.fields["age"].max_value, Some(2.0));
        assert_eq!(search.fields["search"].filters, vec!["search"]);

        let doc = search.describe();
        assert!(doc["fields"]["active"]["enum"].is_array());
        assert!(doc["fields"]["age"].is_object());
    }

    #[test]
    fn test_no_search_field_without_fulltext_index() {
        let (_, search) = build(vec![("flag", vec![json!(true), json!(false)])]);
        assert!(!search.fields.contains_key("search"));
    }

    #[test]
    fn test_metadata_limited_to_top_five_summary_fields() {
        // six summary fields with distinct entropies; the flattest one
        // must fall outside the advertised set
        let mut pairs: Vec<(&str, Vec<Value>)> = Vec::new();
        let names = ["f1", "f2", "f3", "f4", "f5", "f6"];
        for (i, name) in names.iter().enumerate() {
            // i+1 true values out of 12 rows: increasing entropy
            let column: Vec<Value> = (0..12).map(|row| json!(row <= i)).collect();
            pairs.push((name, column));
        }
        let (schema, search) = build(pairs);
        assert_eq!(schema.summary_fields.len(), 6);
        let excluded = schema.summary_fields.last().expect("six fields");
        assert!(!search.fields.contains_key(excluded));
        assert_eq!(search.fields.len(), 5);
    }
}
