use std::path::Path;

use ::csv::ReaderBuilder;
use serde_json::Value;
use siftx_core::Columns;
use tracing::warn;

use crate::Result;

/// Load a delimited file. The first record names the columns; records with
/// a different cell count are skipped; empty cells become null. Cells stay
/// strings - the loader does not guess at numeric columns.
pub fn load_csv(path: &Path, delimiter: u8) -> Result<Columns> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;

    let head: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut output: Vec<Vec<Value>> = vec![Vec::new(); head.len()];

    for record in reader.records() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                warn!(%err, "record ignored");
                continue;
            }
        };
        if record.len() != head.len() {
            warn!(
                cells = record.len(),
                expected = head.len(),
                "ragged record ignored"
            );
            continue;
        }
        for (column, cell) in output.iter_mut().zip(record.iter()) {
            column.push(if cell.is_empty() {
                Value::Null
            } else {
                Value::String(cell.to_string())
            });
        }
    }

    Ok(head.into_iter().zip(output).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn test_load_csv_columns() {
        let file = write_file("name,age\nAlpha,10\nBeta,20\n");
        let columns = load_csv(file.path(), b',').expect("load");
        assert_eq!(columns.len(), 2);
        assert_eq!(
            columns["name"],
            vec![Value::String("Alpha".into()), Value::String("Beta".into())]
        );
        // cells stay strings
        assert_eq!(
            columns["age"],
            vec![Value::String("10".into()), Value::String("20".into())]
        );
    }

    #[test]
    fn test_empty_cells_become_null() {
        let file = write_file("a,b\n1,\n,2\n");
        let columns = load_csv(file.path(), b',').expect("load");
        assert_eq!(columns["a"][1], Value::Null);
        assert_eq!(columns["b"][0], Value::Null);
    }

    #[test]
    fn test_ragged_records_skipped() {
        let file = write_file("a,b\n1,2\nonly-one\n3,4\n");
        let columns = load_csv(file.path(), b',').expect("load");
        assert_eq!(columns["a"].len(), 2);
        assert_eq!(columns["b"].len(), 2);
    }

    #[test]
    fn test_tab_delimiter() {
        let file = write_file("x\ty\n1\t2\n");
        let columns = load_csv(file.path(), b'\t').expect("load");
        assert_eq!(columns["x"], vec![Value::String("1".into())]);
        assert_eq!(columns["y"], vec![Value::String("2".into())]);
    }
}
