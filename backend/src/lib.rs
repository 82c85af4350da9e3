//! # Tablemerge - Panel table transforms
//!
//! Tablemerge turns heterogeneous query results (time series, row-oriented
//! tables, JSON documents, annotations) into one normalized table of ordered
//! columns and ordered rows.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Datasets   │────▶│  Registry   │────▶│  Transform  │────▶│ TableModel  │
//! │ (JSON/CSV)  │     │ (by id)     │     │ (merge +    │     │ (columns +  │
//! │ + panel cfg │     │             │     │  scripts)   │     │  rows)      │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use serde_json::json;
//! use tablemerge::{transform_data_to_table, ColumnDescriptor, PanelConfig, TransformRegistry};
//!
//! let registry = TransformRegistry::new();
//! let data = vec![
//!     json!({"type": "table", "columns": [{"text": "id"}, {"text": "name"}], "rows": [[1, "x"]]}),
//!     json!({"type": "table", "columns": [{"text": "id"}, {"text": "score"}], "rows": [[1, 10]]}),
//! ];
//! let panel = PanelConfig::new("table")
//!     .with_columns(vec![ColumnDescriptor::new("name"), ColumnDescriptor::new("score")])
//!     .with_groupings([Some("id"), Some("id")]);
//!
//! let table = transform_data_to_table(&registry, &data, &panel)?;
//! assert_eq!(table.rows, vec![vec![json!("x"), json!(10)]]);
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Columns, dataset shapes, panel config, output table
//! - [`config`] - Environment configuration
//! - [`input`] - Loading datasets (JSON, CSV) and panel configs
//! - [`transform`] - Registry, transforms, row merging, scripts, pipeline
//! - [`validation`] - JSON Schema validation
//! - [`output`] - JSON, CSV and text rendering
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Input
pub mod input;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Output
pub mod output;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ExpressionError, ExpressionResult, LoadError, LoadResult, OutputError, OutputResult,
    ServerError, ServerResult, TransformError, TransformResult,
};

// =============================================================================
// Re-exports - Models and config
// =============================================================================

pub use config::Config;
pub use models::{
    decode_datasets, Annotation, ColumnDescriptor, Datapoint, DocSeries, PanelConfig, TableData,
    TableModel, TimeSeries,
};

// =============================================================================
// Re-exports - Input
// =============================================================================

pub use input::{
    datasets_from_bytes, load_all_datasets, load_datasets, load_panel, panel_from_bytes,
    panel_from_value, table_from_csv,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{
    is_valid, is_valid_panel_config, validate, validate_datasets, validate_panel_config,
    validate_table_dataset,
};

// =============================================================================
// Re-exports - Transforms
// =============================================================================

pub use transform::{
    describe_columns, merge, transform_data_to_table, transform_values, MergeOptions, MergedRows,
    TransformRegistry, Transformer,
};
pub use transform::script::{evaluate_row_script, ScriptCache, SCRIPT_CACHE};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use output::{render, write_output, OutputFormat};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
