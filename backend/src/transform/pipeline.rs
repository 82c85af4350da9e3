//! High-level pipeline API: `(datasets, panel) → table`.
//!
//! Wraps registry dispatch with input validation and progress logs. The
//! CLI and the HTTP API both go through here.
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use tablemerge::{transform_data_to_table, PanelConfig, TransformRegistry};
//!
//! let registry = TransformRegistry::new();
//! let data = vec![json!({"target": "cpu", "datapoints": [[42, 1000]]})];
//! let table = transform_data_to_table(&registry, &data, &PanelConfig::new("timeseries_to_rows"))?;
//! assert_eq!(table.rows.len(), 1);
//! ```

use serde_json::Value;

use super::registry::TransformRegistry;
use super::script::SCRIPT_CACHE;
use crate::api::logs::{log_error, log_info, log_info_indent, log_success};
use crate::error::{LoadError, LoadResult, TransformResult};
use crate::input::panel_from_value;
use crate::models::{ColumnDescriptor, PanelConfig, TableModel};
use crate::validation::validate_datasets;

/// Run the transform selected by `panel` over `data`.
pub fn transform_data_to_table(
    registry: &TransformRegistry,
    data: &[Value],
    panel: &PanelConfig,
) -> TransformResult<TableModel> {
    log_info(format!(
        "Applying '{}' to {} dataset(s)",
        panel.transform,
        data.len()
    ));

    let result = registry.apply(data, panel);

    match &result {
        Ok(table) => {
            log_success(format!(
                "Built table: {} columns, {} rows",
                table.column_count(),
                table.row_count()
            ));
            if panel.custom_columns.iter().chain(&panel.columns).any(|c| c.is_computed()) {
                log_info_indent(
                    format!(
                        "Script cache: {} entries, {} evictions",
                        SCRIPT_CACHE.len(),
                        SCRIPT_CACHE.evictions()
                    ),
                    1,
                );
            }
        }
        Err(e) => log_error(format!("Transform failed ({}): {}", e.kind(), e)),
    }

    result
}

/// Validate raw input at the boundary, then transform.
///
/// The panel must match the panel schema; for the table transform each
/// dataset must match the table dataset schema.
pub fn transform_values(
    registry: &TransformRegistry,
    data: &[Value],
    panel: &Value,
) -> LoadResult<TableModel> {
    let panel = panel_from_value(panel)?;
    validate_datasets(&panel.transform, data).map_err(|errors| {
        log_error(format!("{} dataset validation error(s)", errors.len()));
        LoadError::Schema { errors }
    })?;
    Ok(transform_data_to_table(registry, data, &panel)?)
}

/// Columns selectable for `data` under transform `id`.
pub fn describe_columns(
    registry: &TransformRegistry,
    id: &str,
    data: &[Value],
) -> TransformResult<Vec<ColumnDescriptor>> {
    let columns = registry.describe_columns(id, data)?;
    log_info(format!("'{}' offers {} column(s)", id, columns.len()));
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use serde_json::json;

    #[test]
    fn test_transform_data_to_table() {
        let registry = TransformRegistry::new();
        let data = vec![json!({"target": "cpu", "datapoints": [[42, 1000], [43, 2000]]})];
        let table =
            transform_data_to_table(&registry, &data, &PanelConfig::new("timeseries_to_rows"))
                .unwrap();
        assert_eq!(table.column_count(), 3);
        assert_eq!(table.rows[1], vec![json!(2000), json!("cpu"), json!(43)]);
    }

    #[test]
    fn test_unknown_transform() {
        let registry = TransformRegistry::new();
        let err = transform_data_to_table(&registry, &[json!({})], &PanelConfig::new("nonexistent"))
            .unwrap_err();
        assert!(matches!(err, TransformError::NotFound(_)));
    }

    #[test]
    fn test_transform_values_validates_panel() {
        let registry = TransformRegistry::new();
        let err = transform_values(&registry, &[], &json!({"columns": []})).unwrap_err();
        assert!(matches!(err, LoadError::Schema { .. }));
    }

    #[test]
    fn test_transform_values_validates_tables() {
        let registry = TransformRegistry::new();
        let data = vec![json!({"type": "table", "columns": [{"text": "a"}]})];
        let err = transform_values(&registry, &data, &json!({"transform": "table"})).unwrap_err();
        match err {
            LoadError::Schema { errors } => assert!(errors[0].starts_with("dataset 0")),
            other => panic!("Expected schema error, got {:?}", other),
        }
    }

    #[test]
    fn test_transform_values_with_script() {
        let registry = TransformRegistry::new();
        let data = vec![json!({"type": "table", "columns": [{"text": "a"}, {"text": "b"}], "rows": [[6, 3]]})];
        let panel = json!({
            "transform": "table",
            "customColumns": [{"text": "ratio", "script": "{a} / {b}"}]
        });
        let table = transform_values(&registry, &data, &panel).unwrap();
        assert_eq!(table.rows, vec![vec![json!(6), json!(3), json!(2)]]);
    }

    #[test]
    fn test_describe_columns() {
        let registry = TransformRegistry::new();
        let columns = describe_columns(&registry, "timeseries_aggregations", &[]).unwrap();
        assert_eq!(columns.len(), 6);
        assert!(describe_columns(&registry, "nope", &[]).is_err());
    }
}
