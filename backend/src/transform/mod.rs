//! Transformation module.
//!
//! - Registry: transform lookup by id
//! - Series, annotations, docs, table: the built-in transforms
//! - Merge: the row-merge engine behind the table transform
//! - Script: computed-column expressions
//! - Stats, flatten: helpers for aggregations and JSON documents
//! - Pipeline: validation, dispatch and logging

pub mod annotations;
pub mod docs;
pub mod flatten;
pub mod merge;
pub mod pipeline;
pub mod registry;
pub mod script;
pub mod series;
pub mod stats;
pub mod table;

pub use merge::{merge, MergeOptions, MergedRows};
pub use pipeline::{describe_columns, transform_data_to_table, transform_values};
pub use registry::{TransformRegistry, Transformer};
