//! The table transform: merge row-oriented datasets into one table.
//!
//! ```text
//! datasets ──▶ apply panel groupings ──▶ target columns ──▶ merge ──▶ TableModel
//!                                        (panel.columns or
//!                                         union of dataset
//!                                         columns, + custom)
//! ```
//!
//! The output column list is exactly the list rows are computed over, so
//! every row has one cell per column.

use serde_json::Value;

use super::merge::{merge, MergeOptions};
use super::registry::Transformer;
use crate::api::logs::{log_info, log_warning};
use crate::error::{TransformError, TransformResult};
use crate::models::{decode_datasets, ColumnDescriptor, PanelConfig, TableData, TableModel};

const SHAPE: &str = "table";

#[derive(Debug, Clone, Copy, Default)]
pub struct TableTransformer;

impl Transformer for TableTransformer {
    fn id(&self) -> &'static str {
        "table"
    }

    fn description(&self) -> &'static str {
        "Table"
    }

    fn columns(&self, data: &[Value]) -> TransformResult<Vec<ColumnDescriptor>> {
        let tables = decode_datasets::<TableData>(data, SHAPE)?;
        match tables.as_slice() {
            [] => Ok(Vec::new()),
            [single] => Ok(single.columns.clone()),
            many => Ok(extract_columns(many)),
        }
    }

    fn transform(&self, data: &[Value], panel: &PanelConfig) -> TransformResult<TableModel> {
        let mut tables = decode_datasets::<TableData>(data, SHAPE)?;

        if !tables.first().is_some_and(TableData::is_table) {
            return Err(TransformError::Format(
                "Query result is not in table format, try using another transform.".to_string(),
            ));
        }

        for (index, table) in tables.iter_mut().enumerate() {
            if let Some(grouping) = panel.grouping_for(index) {
                table.grouping = Some(grouping.to_string());
            }
        }

        let targets = target_columns(&tables, panel);
        let options = MergeOptions {
            exclude_ungrouped: panel.exclude_ungrouped,
        };
        let merged = merge(&tables, &targets, options)?;

        if tables.len() > 1 {
            if merged.grouping_active {
                log_info(format!("Merged {} datasets by grouping column", tables.len()));
            } else {
                log_info(format!("Merged {} datasets by row position", tables.len()));
            }
        }
        if merged.excluded > 0 {
            log_warning(format!("Excluded {} ungrouped rows", merged.excluded));
        }

        Ok(TableModel {
            columns: targets,
            rows: merged.rows,
        })
    }
}

/// All datasets' columns in order, each stamped with its source position.
pub fn extract_columns(tables: &[TableData]) -> Vec<ColumnDescriptor> {
    tables
        .iter()
        .enumerate()
        .flat_map(|(data_index, table)| {
            table
                .columns
                .iter()
                .enumerate()
                .map(move |(cell_index, column)| {
                    let mut column = column.clone();
                    column.data_index.get_or_insert(data_index);
                    column.cell_index.get_or_insert(cell_index);
                    column
                })
        })
        .collect()
}

/// Columns the output rows are computed over.
///
/// Caller-selected columns when present, otherwise every dataset column.
/// A custom column takes the place of a plain column with the same name and
/// is appended otherwise; identical columns are not repeated.
fn target_columns(tables: &[TableData], panel: &PanelConfig) -> Vec<ColumnDescriptor> {
    let mut targets = if panel.columns.is_empty() {
        extract_columns(tables)
    } else {
        panel.columns.clone()
    };

    for custom in &panel.custom_columns {
        if targets.contains(custom) {
            continue;
        }
        let plain = targets
            .iter_mut()
            .find(|c| c.text == custom.text && c.script.is_none());
        match plain {
            Some(column) => *column = custom.clone(),
            None => targets.push(custom.clone()),
        }
    }

    targets
}
