//! Annotation listing: one row per event, `[min, title, text, tags]`.

use serde_json::Value;

use super::registry::Transformer;
use crate::error::TransformResult;
use crate::models::{decode_datasets, Annotation, ColumnDescriptor, PanelConfig, TableModel};

#[derive(Debug, Clone, Copy, Default)]
pub struct AnnotationsTransformer;

impl Transformer for AnnotationsTransformer {
    fn id(&self) -> &'static str {
        "annotations"
    }

    fn description(&self) -> &'static str {
        "Annotations"
    }

    fn columns(&self, _data: &[Value]) -> TransformResult<Vec<ColumnDescriptor>> {
        Ok(Vec::new())
    }

    fn transform(&self, data: &[Value], _panel: &PanelConfig) -> TransformResult<TableModel> {
        let mut table = TableModel::with_columns(vec![
            ColumnDescriptor::date("Time"),
            ColumnDescriptor::new("Title"),
            ColumnDescriptor::new("Text"),
            ColumnDescriptor::new("Tags"),
        ]);

        table.rows = decode_datasets::<Annotation>(data, "annotation")?
            .into_iter()
            .map(|event| vec![event.min, event.title, event.text, event.tags])
            .collect();

        Ok(table)
    }
}
