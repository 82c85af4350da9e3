//! Domain models for the table transform pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`ColumnDescriptor`] - A column of a dataset or of the output table
//! - [`TableData`] - A row-oriented query result (`type: "table"`)
//! - [`TimeSeries`] - A named series of `[value, time]` datapoints
//! - [`DocSeries`] - A list of JSON documents (`type: "docs"`)
//! - [`Annotation`] - A single annotation event
//! - [`PanelConfig`] - Panel settings selecting and configuring a transform
//! - [`TableModel`] - The normalized output table
//!
//! Datasets arrive as raw JSON and are decoded into one of the typed shapes
//! by the transform that consumes them (see [`decode_datasets`]).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{TransformError, TransformResult};

// =============================================================================
// Columns
// =============================================================================

/// Description of a single column.
///
/// `text` is the display name and doubles as the merge/lookup key for the
/// table transform, so it must be unique among the columns of one output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDescriptor {
    /// Display name.
    pub text: String,

    /// Lookup key when it differs from the display name (stat names,
    /// flattened JSON paths).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// Expression template producing a computed value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,

    /// Display type hint, e.g. `"date"`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub column_type: Option<String>,

    /// Index of the dataset this column comes from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_index: Option<usize>,

    /// Index of the cell within a row of that dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cell_index: Option<usize>,
}

impl ColumnDescriptor {
    /// Create a plain column with a display name.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Create a column holding epoch-millisecond timestamps.
    pub fn date(text: impl Into<String>) -> Self {
        Self::new(text).with_type("date")
    }

    /// Set the lookup key.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the computed-column script.
    pub fn with_script(mut self, script: impl Into<String>) -> Self {
        self.script = Some(script.into());
        self
    }

    /// Set the display type hint.
    pub fn with_type(mut self, column_type: impl Into<String>) -> Self {
        self.column_type = Some(column_type.into());
        self
    }

    /// Set the source dataset and cell position.
    pub fn with_source(mut self, data_index: usize, cell_index: usize) -> Self {
        self.data_index = Some(data_index);
        self.cell_index = Some(cell_index);
        self
    }

    /// Key used to look values up: `value` when set, otherwise `text`.
    pub fn lookup_key(&self) -> &str {
        self.value.as_deref().unwrap_or(&self.text)
    }

    /// Whether this column is computed from a script.
    pub fn is_computed(&self) -> bool {
        self.script.is_some()
    }

    /// Whether this column holds timestamps.
    pub fn is_date(&self) -> bool {
        self.column_type.as_deref() == Some("date")
    }
}

// =============================================================================
// Dataset shapes
// =============================================================================

/// A row-oriented query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableData {
    /// Shape tag; the table transform requires `"table"`.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Columns, positionally aligned with the cells of each row.
    pub columns: Vec<ColumnDescriptor>,

    /// Rows of scalar cells.
    pub rows: Vec<Vec<Value>>,

    /// Column name used as merge key for this dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouping: Option<String>,
}

impl TableData {
    /// Whether the dataset is tagged as a table.
    pub fn is_table(&self) -> bool {
        self.kind.as_deref() == Some("table")
    }
}

/// A single `[value, time]` pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Datapoint(pub Value, pub Value);

impl Datapoint {
    /// The measured value (may be null).
    pub fn value(&self) -> &Value {
        &self.0
    }

    /// The timestamp.
    pub fn time(&self) -> &Value {
        &self.1
    }
}

/// A named time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Series name.
    #[serde(default)]
    pub target: String,

    /// Datapoints in query order.
    pub datapoints: Vec<Datapoint>,
}

/// A list of JSON documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSeries {
    /// Shape tag, `"docs"` for document results.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// The documents.
    #[serde(default)]
    pub datapoints: Vec<Value>,
}

impl DocSeries {
    /// Whether the dataset is tagged as documents.
    pub fn is_docs(&self) -> bool {
        self.kind.as_deref() == Some("docs")
    }
}

/// An annotation event.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Annotation {
    /// Event time (epoch milliseconds).
    #[serde(default)]
    pub min: Value,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub text: Value,
    #[serde(default)]
    pub tags: Value,
}

/// Decode every raw dataset into the shape `T`.
///
/// `shape` names the expected shape in the error message.
pub fn decode_datasets<T: DeserializeOwned>(data: &[Value], shape: &str) -> TransformResult<Vec<T>> {
    data.iter()
        .enumerate()
        .map(|(i, dataset)| {
            T::deserialize(dataset).map_err(|e| {
                TransformError::Format(format!("dataset {} is not a valid {}: {}", i, shape, e))
            })
        })
        .collect()
}

// =============================================================================
// Panel configuration
// =============================================================================

/// Panel settings for a transform.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelConfig {
    /// Transform identifier, e.g. `"table"`.
    pub transform: String,

    /// Caller-selected columns.
    #[serde(default)]
    pub columns: Vec<ColumnDescriptor>,

    /// Extra columns appended by the table transform (usually computed).
    #[serde(default)]
    pub custom_columns: Vec<ColumnDescriptor>,

    /// Grouping designator per dataset, by index.
    #[serde(default)]
    pub groupings: Vec<Option<String>>,

    /// Drop merged rows that miss a grouping value.
    #[serde(default)]
    pub exclude_ungrouped: bool,
}

impl PanelConfig {
    /// Create a config for a transform with no columns.
    pub fn new(transform: impl Into<String>) -> Self {
        Self {
            transform: transform.into(),
            ..Self::default()
        }
    }

    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn with_columns(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.columns = columns;
        self
    }

    pub fn with_custom_columns(mut self, columns: Vec<ColumnDescriptor>) -> Self {
        self.custom_columns = columns;
        self
    }

    pub fn with_groupings<I, S>(mut self, groupings: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        self.groupings = groupings.into_iter().map(|g| g.map(Into::into)).collect();
        self
    }

    pub fn exclude_ungrouped(mut self, exclude: bool) -> Self {
        self.exclude_ungrouped = exclude;
        self
    }

    /// Grouping configured for dataset `index`, if any.
    pub fn grouping_for(&self, index: usize) -> Option<&str> {
        self.groupings.get(index).and_then(|g| g.as_deref())
    }
}

// =============================================================================
// Output table
// =============================================================================

/// The normalized output: ordered columns and ordered rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TableModel {
    pub columns: Vec<ColumnDescriptor>,
    pub rows: Vec<Vec<Value>>,
}

impl TableModel {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with columns and no rows.
    pub fn with_columns(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    /// Position of the column with display name `text`.
    pub fn column_index(&self, text: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.text == text)
    }

    /// Whether every row has exactly one cell per column.
    pub fn is_rectangular(&self) -> bool {
        let width = self.columns.len();
        self.rows.iter().all(|row| row.len() == width)
    }
}
