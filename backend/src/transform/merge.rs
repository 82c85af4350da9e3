//! Merge several row-oriented datasets into one list of output rows.
//!
//! # Architecture
//!
//! ```text
//! dataset 0 (grouping "id")        dataset 1 (grouping "id")
//! ┌──────────────────────┐         ┌──────────────────────┐
//! │ id: 1, name: "x"     │         │ id: 1, score: 10     │
//! │ id: 2, name: "y"     │         └──────────────────────┘
//! └──────────────────────┘
//!             │  named rows, union-assigned per grouping key
//!             ▼
//! ┌─────────────────────────────────┐   target columns [name, score]
//! │ 1 → {id: 1, name: "x", score: 10}│  ─────────────────────────────▶ ["x", 10]
//! │ 2 → {id: 2, name: "y"}           │  ─────────────────────────────▶ ["y", null]
//! └─────────────────────────────────┘
//! ```
//!
//! Grouping is all-or-nothing: it is used only when every dataset declares a
//! grouping column, otherwise rows are merged by their position within their
//! own dataset. Later datasets overwrite earlier ones on field-name
//! collisions, and output rows keep the first-seen order of their keys.

use serde_json::{Map, Value};
use std::collections::HashMap;

use super::script::interpreter::format_number;
use super::script::{evaluate_row_script_with, ScriptCache, SCRIPT_CACHE};
use crate::error::{TransformError, TransformResult};
use crate::models::{ColumnDescriptor, TableData};

/// A row keyed by its columns' display names.
pub type NamedRow = Map<String, Value>;

/// Row filtering policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Drop merged rows that lack a value for any dataset's grouping column.
    /// Only applies while grouping is active.
    pub exclude_ungrouped: bool,
}

/// Output of a merge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRows {
    /// One row per kept grouping key, one cell per target column.
    pub rows: Vec<Vec<Value>>,
    /// Whether rows were merged by grouping value rather than position.
    pub grouping_active: bool,
    /// Number of merged rows dropped by `exclude_ungrouped`.
    pub excluded: usize,
}

/// Identity of a merged row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum GroupKey {
    /// Text form of the grouping value: `1`, `1.0` and `"1"` share a key.
    Value(String),
    /// Row position within its dataset.
    Ordinal(usize),
    /// Null or absent grouping value. All such rows share one entry.
    Missing,
}

impl GroupKey {
    fn of(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => GroupKey::Missing,
            Some(value) => GroupKey::Value(key_text(value)),
        }
    }
}

/// Text a grouping value is keyed by.
fn key_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => format_number(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::Array(items) => items.iter().map(key_text).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Re-express each row of `dataset` as a name → value map.
///
/// The n-th cell belongs to the n-th column of the same dataset. Extra cells
/// without a column are a [`TransformError::Resolution`].
pub fn named_rows(dataset: &TableData, dataset_index: usize) -> TransformResult<Vec<NamedRow>> {
    dataset
        .rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            row.iter()
                .enumerate()
                .map(|(cell_index, cell)| {
                    let column = dataset.columns.get(cell_index).ok_or(TransformError::Resolution {
                        dataset: dataset_index,
                        row: row_index,
                        cell: cell_index,
                    })?;
                    Ok((column.text.clone(), cell.clone()))
                })
                .collect::<TransformResult<NamedRow>>()
        })
        .collect()
}

/// The grouping column of `dataset`, if it declares a usable one.
fn grouping_of(dataset: &TableData) -> Option<&str> {
    dataset.grouping.as_deref().filter(|g| !g.is_empty())
}

/// Whether every dataset declares a grouping column.
pub fn grouping_active(datasets: &[TableData]) -> bool {
    datasets.iter().all(|d| grouping_of(d).is_some())
}

/// Merge `datasets` and materialize `targets` for each merged row, using the
/// process-wide script cache.
pub fn merge(
    datasets: &[TableData],
    targets: &[ColumnDescriptor],
    options: MergeOptions,
) -> TransformResult<MergedRows> {
    merge_with_cache(&SCRIPT_CACHE, datasets, targets, options)
}

/// Same as [`merge`] with an explicit script cache.
pub fn merge_with_cache(
    cache: &ScriptCache,
    datasets: &[TableData],
    targets: &[ColumnDescriptor],
    options: MergeOptions,
) -> TransformResult<MergedRows> {
    let named = datasets
        .iter()
        .enumerate()
        .map(|(i, dataset)| named_rows(dataset, i))
        .collect::<TransformResult<Vec<_>>>()?;

    let active = grouping_active(datasets);

    let mut merged: Vec<NamedRow> = Vec::new();
    let mut slots: HashMap<GroupKey, usize> = HashMap::new();

    for (dataset, rows) in datasets.iter().zip(named) {
        let grouping = grouping_of(dataset).filter(|_| active);

        for (row_index, row) in rows.into_iter().enumerate() {
            let key = match grouping {
                Some(field) => GroupKey::of(row.get(field)),
                None => GroupKey::Ordinal(row_index),
            };

            let slot = *slots.entry(key).or_insert_with(|| {
                merged.push(NamedRow::new());
                merged.len() - 1
            });
            merged[slot].extend(row);
        }
    }

    let mut result = MergedRows {
        rows: Vec::with_capacity(merged.len()),
        grouping_active: active,
        excluded: 0,
    };

    for row in &merged {
        if options.exclude_ungrouped && active && !is_grouped(row, datasets) {
            result.excluded += 1;
            continue;
        }
        result.rows.push(materialize(cache, row, targets)?);
    }

    Ok(result)
}

/// Whether the merged row carries a non-null value for every dataset's
/// grouping column.
fn is_grouped(row: &NamedRow, datasets: &[TableData]) -> bool {
    datasets
        .iter()
        .filter_map(grouping_of)
        .all(|field| row.get(field).is_some_and(|v| !v.is_null()))
}

/// Build one output row: computed columns are evaluated, the rest looked up.
fn materialize(
    cache: &ScriptCache,
    row: &NamedRow,
    targets: &[ColumnDescriptor],
) -> TransformResult<Vec<Value>> {
    targets
        .iter()
        .map(|column| match &column.script {
            Some(script) => evaluate_row_script_with(cache, script, row, targets),
            None => Ok(row.get(&column.text).cloned().unwrap_or(Value::Null)),
        })
        .collect()
}
