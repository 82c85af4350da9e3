//! JSON Schema validation for panel configurations and table datasets.
//!
//! Validation happens at the ingestion boundary, before any transform runs,
//! so malformed input is reported with every offending field at once rather
//! than as the first decoding error.
//!
//! # Embedded Schemas
//!
//! Schemas (JSON Schema Draft 7) are embedded at compile time from the
//! `schemas/` directory:
//! - `panel-config.json`
//! - `table-dataset.json`
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use tablemerge::validation::{is_valid_panel_config, validate_table_dataset};
//!
//! assert!(is_valid_panel_config(&json!({"transform": "table"})));
//! assert!(validate_table_dataset(&json!({"type": "table", "rows": []})).is_err());
//! ```

use once_cell::sync::Lazy;
use serde_json::Value;

static PANEL_CONFIG_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/panel-config.json"))
        .expect("Invalid embedded schema")
});

static TABLE_DATASET_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/table-dataset.json"))
        .expect("Invalid embedded schema")
});

/// Validate `data` against `schema`.
///
/// Returns every validation error.
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator =
        jsonschema::draft7::new(schema).map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator.iter_errors(data).map(|e| e.to_string()).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate a panel configuration.
pub fn validate_panel_config(data: &Value) -> Result<(), Vec<String>> {
    validate(&PANEL_CONFIG_SCHEMA, data)
}

pub fn is_valid_panel_config(data: &Value) -> bool {
    is_valid(&PANEL_CONFIG_SCHEMA, data)
}

/// Validate a single row-oriented dataset.
pub fn validate_table_dataset(data: &Value) -> Result<(), Vec<String>> {
    validate(&TABLE_DATASET_SCHEMA, data)
}

/// Validate the datasets a transform will consume.
///
/// Only the table transform has a dataset schema; other transforms accept
/// their input as-is here and report shape problems when they decode it.
/// Errors are prefixed with the dataset index.
pub fn validate_datasets(transform: &str, datasets: &[Value]) -> Result<(), Vec<String>> {
    if transform != "table" {
        return Ok(());
    }

    let errors: Vec<String> = datasets
        .iter()
        .enumerate()
        .filter_map(|(i, dataset)| validate_table_dataset(dataset).err().map(|errs| (i, errs)))
        .flat_map(|(i, errs)| errs.into_iter().map(move |e| format!("dataset {}: {}", i, e)))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_panel() {
        let panel = json!({
            "transform": "table",
            "columns": [{"text": "host"}, {"text": "Load", "value": "load"}],
            "customColumns": [{"text": "Ratio", "script": "{a} / {b}"}],
            "groupings": ["host", null],
            "excludeUngrouped": true
        });
        assert!(is_valid_panel_config(&panel));
        assert!(validate_panel_config(&panel).is_ok());
    }

    #[test]
    fn test_panel_missing_transform() {
        let errors = validate_panel_config(&json!({"columns": []})).unwrap_err();
        assert!(!errors.is_empty());
        assert!(errors.iter().any(|e| e.contains("transform")));
    }

    #[test]
    fn test_panel_bad_column() {
        let panel = json!({"transform": "json", "columns": [{"value": "a"}], "groupings": [1]});
        let errors = validate_panel_config(&panel).unwrap_err();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_table_dataset() {
        let good = json!({"type": "table", "columns": [{"text": "a"}], "rows": [[1]], "grouping": "a"});
        assert!(validate_table_dataset(&good).is_ok());

        let bad = json!({"type": "docs", "columns": [], "rows": [1]});
        assert!(validate_table_dataset(&bad).is_err());
    }

    #[test]
    fn test_validate_datasets_prefixes_index() {
        let data = vec![
            json!({"type": "table", "columns": [], "rows": []}),
            json!({"type": "table", "columns": []}),
        ];
        let errors = validate_datasets("table", &data).unwrap_err();
        assert!(errors.iter().all(|e| e.starts_with("dataset 1: ")));

        assert!(validate_datasets("timeseries_to_rows", &data).is_ok());
    }
}
