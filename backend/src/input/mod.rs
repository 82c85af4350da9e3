//! Loading datasets and panel configurations.
//!
//! Datasets come from JSON files holding an array of datasets, or from CSV
//! files which become a single `type: "table"` dataset:
//!
//! ```text
//! host;cpu            {"type": "table",
//! a;0.5         ──▶     "columns": [{"text": "host"}, {"text": "cpu"}],
//! b;0.7                 "rows": [["a", 0.5], ["b", 0.7]]}
//! ```
//!
//! The CSV delimiter is detected from the header line and numeric cells are
//! read as numbers.

use serde::Deserialize;
use serde_json::{json, Number, Value};
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::models::PanelConfig;
use crate::validation::validate_panel_config;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

// =============================================================================
// Datasets
// =============================================================================

/// Load datasets from a `.json` or `.csv` file.
pub fn load_datasets<P: AsRef<Path>>(path: P) -> LoadResult<Vec<Value>> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;

    let is_csv = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    if is_csv {
        Ok(vec![table_from_csv(&bytes)?])
    } else {
        datasets_from_bytes(&bytes)
    }
}

/// Load and concatenate datasets from several files, in order.
pub fn load_all_datasets<P: AsRef<Path>>(paths: &[P]) -> LoadResult<Vec<Value>> {
    let mut datasets = Vec::new();
    for path in paths {
        datasets.extend(load_datasets(path)?);
    }
    Ok(datasets)
}

/// Parse a JSON array of datasets.
pub fn datasets_from_bytes(bytes: &[u8]) -> LoadResult<Vec<Value>> {
    match serde_json::from_slice(strip_bom(bytes))? {
        Value::Array(datasets) => Ok(datasets),
        _ => Err(LoadError::NotAnArray),
    }
}

/// Detect the delimiter by counting candidates in the first line.
pub fn detect_delimiter(content: &str) -> u8 {
    let first_line = content.lines().next().unwrap_or("");

    [b',', b';', b'\t', b'|']
        .into_iter()
        .max_by_key(|&sep| first_line.matches(sep as char).count())
        .filter(|&sep| first_line.contains(sep as char))
        .unwrap_or(b',')
}

/// Read CSV bytes as a table dataset.
pub fn table_from_csv(bytes: &[u8]) -> LoadResult<Value> {
    let content = String::from_utf8_lossy(strip_bom(bytes));
    let delimiter = detect_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.iter().all(str::is_empty) {
        return Err(LoadError::EmptyCsv);
    }

    let columns: Vec<Value> = headers.iter().map(|h| json!({"text": h})).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        rows.push(record.iter().map(csv_cell).collect::<Vec<_>>());
    }

    Ok(json!({
        "type": "table",
        "columns": columns,
        "rows": rows,
    }))
}

fn csv_cell(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::from(n);
    }
    raw.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or_else(|| Value::String(raw.to_string()))
}

// =============================================================================
// Panel configuration
// =============================================================================

/// Load and validate a panel configuration file.
pub fn load_panel<P: AsRef<Path>>(path: P) -> LoadResult<PanelConfig> {
    let bytes = std::fs::read(path)?;
    panel_from_bytes(&bytes)
}

pub fn panel_from_bytes(bytes: &[u8]) -> LoadResult<PanelConfig> {
    let value: Value = serde_json::from_slice(strip_bom(bytes))?;
    panel_from_value(&value)
}

/// Validate a panel configuration against its schema, then decode it.
pub fn panel_from_value(value: &Value) -> LoadResult<PanelConfig> {
    validate_panel_config(value).map_err(|errors| LoadError::Schema { errors })?;
    Ok(PanelConfig::deserialize(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str, content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_datasets_from_bytes() {
        let data = datasets_from_bytes(br#"[{"target": "cpu", "datapoints": []}]"#).unwrap();
        assert_eq!(data.len(), 1);

        let err = datasets_from_bytes(br#"{"target": "cpu"}"#).unwrap_err();
        assert!(matches!(err, LoadError::NotAnArray));

        let err = datasets_from_bytes(b"not json").unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }

    #[test]
    fn test_bom_is_ignored() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"[]");
        assert!(datasets_from_bytes(&bytes).unwrap().is_empty());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), b';');
        assert_eq!(detect_delimiter("a,b\n1,2"), b',');
        assert_eq!(detect_delimiter("a\tb\tc"), b'\t');
        assert_eq!(detect_delimiter("a|b"), b'|');
        assert_eq!(detect_delimiter("single"), b',');
    }

    #[test]
    fn test_table_from_csv() {
        let table = table_from_csv(b"host;cpu;note\na;0.5;\nb;7;\"x;y\"\n\n").unwrap();
        assert_eq!(table["type"], "table");
        assert_eq!(table["columns"][1]["text"], "cpu");
        assert_eq!(
            table["rows"],
            json!([["a", 0.5, null], ["b", 7, "x;y"]])
        );
    }

    #[test]
    fn test_empty_csv() {
        assert!(table_from_csv(b"").is_err());
    }

    #[test]
    fn test_load_datasets_by_extension() {
        let csv = temp_file(".csv", "id,name\n1,x\n");
        let json = temp_file(".json", r#"[{"type": "table", "columns": [], "rows": []}]"#);

        let from_csv = load_datasets(csv.path()).unwrap();
        assert_eq!(from_csv[0]["rows"], json!([[1, "x"]]));

        let all = load_all_datasets(&[csv.path(), json.path()]).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_load_panel() {
        let file = temp_file(".json", r#"{"transform": "table", "groupings": ["id"]}"#);
        let panel = load_panel(file.path()).unwrap();
        assert_eq!(panel.transform, "table");
        assert_eq!(panel.grouping_for(0), Some("id"));
    }

    #[test]
    fn test_invalid_panel_reports_schema_errors() {
        let err = panel_from_bytes(br#"{"columns": "nope"}"#).unwrap_err();
        match err {
            LoadError::Schema { errors } => assert_eq!(errors.len(), 2),
            other => panic!("Expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = load_panel("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }
}
