//! JSON document extraction.
//!
//! With columns selected, each document is flattened and the selected
//! dotted paths become cells. Without columns (or for non-object documents)
//! the whole document is rendered as JSON text in the first cell.

use serde_json::Value;
use std::collections::HashSet;

use super::flatten::flatten;
use super::registry::Transformer;
use crate::config::DEFAULT_MAX_DOCS;
use crate::error::TransformResult;
use crate::models::{decode_datasets, ColumnDescriptor, DocSeries, PanelConfig, TableModel};

const SHAPE: &str = "document series";

#[derive(Debug, Clone, Copy)]
pub struct JsonTransformer {
    /// Documents scanned per dataset when describing columns.
    max_docs: usize,
}

impl JsonTransformer {
    pub fn new(max_docs: usize) -> Self {
        Self { max_docs }
    }
}

impl Default for JsonTransformer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DOCS)
    }
}

impl Transformer for JsonTransformer {
    fn id(&self) -> &'static str {
        "json"
    }

    fn description(&self) -> &'static str {
        "JSON Data"
    }

    /// Every dotted path seen in the first `max_docs` documents of each
    /// `docs` dataset, in first-seen order.
    fn columns(&self, data: &[Value]) -> TransformResult<Vec<ColumnDescriptor>> {
        let mut seen = HashSet::new();
        let mut names: Vec<String> = Vec::new();

        for series in decode_datasets::<DocSeries>(data, SHAPE)? {
            if !series.is_docs() {
                continue;
            }
            for doc in series.datapoints.iter().take(self.max_docs) {
                for path in flatten(doc, None).into_iter().map(|(k, _)| k) {
                    if seen.insert(path.clone()) {
                        names.push(path);
                    }
                }
            }
        }

        Ok(names
            .into_iter()
            .map(|name| ColumnDescriptor::new(name.clone()).with_value(name))
            .collect())
    }

    fn transform(&self, data: &[Value], panel: &PanelConfig) -> TransformResult<TableModel> {
        let mut table = if panel.columns.is_empty() {
            TableModel::with_columns(vec![ColumnDescriptor::new("JSON")])
        } else {
            TableModel::with_columns(
                panel
                    .columns
                    .iter()
                    .map(|c| ColumnDescriptor::new(c.text.clone()))
                    .collect(),
            )
        };
        let width = table.column_count();

        for series in decode_datasets::<DocSeries>(data, SHAPE)? {
            for doc in &series.datapoints {
                let row = if doc.is_object() && !panel.columns.is_empty() {
                    let flat = flatten(doc, None);
                    panel
                        .columns
                        .iter()
                        .map(|c| flat.get(c.lookup_key()).cloned().unwrap_or(Value::Null))
                        .collect()
                } else {
                    let mut row = vec![Value::String(serde_json::to_string(doc)?)];
                    row.resize(width, Value::Null);
                    row
                };
                table.rows.push(row);
            }
        }

        Ok(table)
    }
}
