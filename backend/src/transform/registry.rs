//! Transformer registry - Look transforms up by identifier
//!
//! The registry is built once with every known transform and is read-only
//! afterwards, so it can be shared freely between threads.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use super::annotations::AnnotationsTransformer;
use super::docs::JsonTransformer;
use super::series::{
    TimeSeriesAggregationsTransformer, TimeSeriesToColumnsTransformer, TimeSeriesToRowsTransformer,
};
use super::table::TableTransformer;
use crate::config::Config;
use crate::error::{TransformError, TransformResult};
use crate::models::{ColumnDescriptor, PanelConfig, TableModel};

/// A named strategy turning datasets into a [`TableModel`].
pub trait Transformer: Send + Sync {
    /// Identifier used in panel configuration.
    fn id(&self) -> &'static str;

    /// Human-readable label.
    fn description(&self) -> &'static str;

    /// Columns a caller could select for `data`.
    fn columns(&self, data: &[Value]) -> TransformResult<Vec<ColumnDescriptor>>;

    /// Build the output table. `data` is never empty.
    fn transform(&self, data: &[Value], panel: &PanelConfig) -> TransformResult<TableModel>;
}

/// Identifier → transformer mapping.
pub struct TransformRegistry {
    transformers: HashMap<&'static str, Box<dyn Transformer>>,
    /// Registration order, for listing.
    order: Vec<&'static str>,
}

impl TransformRegistry {
    /// Registry with every built-in transform and default settings.
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    /// Registry with every built-in transform.
    pub fn with_config(config: &Config) -> Self {
        Self::empty()
            .register(TimeSeriesToRowsTransformer)
            .register(TimeSeriesToColumnsTransformer)
            .register(TimeSeriesAggregationsTransformer)
            .register(AnnotationsTransformer)
            .register(TableTransformer)
            .register(JsonTransformer::new(config.max_docs))
    }

    /// Registry with no transforms.
    pub fn empty() -> Self {
        Self {
            transformers: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Add a transform, replacing any previous one with the same id.
    pub fn register(mut self, transformer: impl Transformer + 'static) -> Self {
        let id = transformer.id();
        if self.transformers.insert(id, Box::new(transformer)).is_none() {
            self.order.push(id);
        }
        self
    }

    /// Get a transform by id.
    pub fn get(&self, id: &str) -> TransformResult<&dyn Transformer> {
        self.transformers
            .get(id)
            .map(|t| t.as_ref())
            .ok_or_else(|| TransformError::NotFound(id.to_string()))
    }

    /// Whether a transform with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.transformers.contains_key(id)
    }

    /// `(id, description)` pairs in registration order.
    pub fn list(&self) -> Vec<(&'static str, &'static str)> {
        self.order
            .iter()
            .filter_map(|id| self.transformers.get(id))
            .map(|t| (t.id(), t.description()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Columns selectable for `data` under transform `id`.
    pub fn describe_columns(&self, id: &str, data: &[Value]) -> TransformResult<Vec<ColumnDescriptor>> {
        self.get(id)?.columns(data)
    }

    /// Run the transform named by `panel.transform`.
    ///
    /// The id is checked first; empty `data` then yields an empty table.
    pub fn apply(&self, data: &[Value], panel: &PanelConfig) -> TransformResult<TableModel> {
        let transformer = self.get(&panel.transform)?;
        if data.is_empty() {
            return Ok(TableModel::new());
        }
        transformer.transform(data, panel)
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformRegistry")
            .field("transformers", &self.order)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_ids() {
        let registry = TransformRegistry::new();
        let ids: Vec<_> = registry.list().into_iter().map(|(id, _)| id).collect();
        assert_eq!(
            ids,
            vec![
                "timeseries_to_rows",
                "timeseries_to_columns",
                "timeseries_aggregations",
                "annotations",
                "table",
                "json"
            ]
        );
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn test_unknown_transform() {
        let registry = TransformRegistry::new();
        let err = registry.get("pivot").err().unwrap();
        assert_eq!(err.to_string(), "Transformer pivot not found");
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn test_unknown_checked_before_empty_data() {
        let registry = TransformRegistry::new();
        let err = registry.apply(&[], &PanelConfig::new("pivot")).unwrap_err();
        assert!(matches!(err, TransformError::NotFound(id) if id == "pivot"));
    }

    #[test]
    fn test_empty_data_yields_empty_table() {
        let registry = TransformRegistry::new();
        for (id, _) in registry.list() {
            let table = registry.apply(&[], &PanelConfig::new(id)).unwrap();
            assert!(table.is_empty(), "{} should yield an empty table", id);
        }
    }

    #[test]
    fn test_register_replaces() {
        let registry = TransformRegistry::empty()
            .register(TableTransformer)
            .register(TableTransformer);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("table"));
        assert!(!registry.contains("json"));
    }

    #[test]
    fn test_apply_dispatches() {
        let registry = TransformRegistry::new();
        let data = vec![json!({"target": "cpu", "datapoints": [[42, 1000]]})];
        let table = registry
            .apply(&data, &PanelConfig::new("timeseries_to_rows"))
            .unwrap();
        assert_eq!(table.rows, vec![vec![json!(1000), json!("cpu"), json!(42)]]);
    }
}
