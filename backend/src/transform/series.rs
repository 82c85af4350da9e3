//! Time-series transforms.
//!
//! ```text
//! [{target: "cpu", datapoints: [[42, 1000], [43, 2000]]}]
//!
//! timeseries_to_rows        timeseries_to_columns     timeseries_aggregations
//! Time  Metric Value        Time  cpu                 Metric  Avg
//! 1000  cpu    42           1000  42                  cpu     42.5
//! 2000  cpu    43           2000  43
//! ```

use serde_json::Value;
use std::collections::HashMap;

use super::registry::Transformer;
use super::stats;
use crate::error::TransformResult;
use crate::models::{decode_datasets, ColumnDescriptor, PanelConfig, TableModel, TimeSeries};

const SHAPE: &str = "time series";

fn decode(data: &[Value]) -> TransformResult<Vec<TimeSeries>> {
    decode_datasets(data, SHAPE)
}

// =============================================================================
// Series to rows
// =============================================================================

/// One row per datapoint: `[time, target, value]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesToRowsTransformer;

impl TimeSeriesToRowsTransformer {
    fn output_columns() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::date("Time"),
            ColumnDescriptor::new("Metric"),
            ColumnDescriptor::new("Value"),
        ]
    }
}

impl Transformer for TimeSeriesToRowsTransformer {
    fn id(&self) -> &'static str {
        "timeseries_to_rows"
    }

    fn description(&self) -> &'static str {
        "Time series to rows"
    }

    fn columns(&self, _data: &[Value]) -> TransformResult<Vec<ColumnDescriptor>> {
        Ok(Vec::new())
    }

    fn transform(&self, data: &[Value], _panel: &PanelConfig) -> TransformResult<TableModel> {
        let mut table = TableModel::with_columns(Self::output_columns());

        for series in decode(data)? {
            for dp in &series.datapoints {
                table.rows.push(vec![
                    dp.time().clone(),
                    Value::String(series.target.clone()),
                    dp.value().clone(),
                ]);
            }
        }

        Ok(table)
    }
}

// =============================================================================
// Series to columns
// =============================================================================

/// One column per series, one row per distinct timestamp.
///
/// Rows follow the order in which timestamps are first seen; cells of series
/// without a point at that time are null.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesToColumnsTransformer;

impl Transformer for TimeSeriesToColumnsTransformer {
    fn id(&self) -> &'static str {
        "timeseries_to_columns"
    }

    fn description(&self) -> &'static str {
        "Time series to columns"
    }

    fn columns(&self, _data: &[Value]) -> TransformResult<Vec<ColumnDescriptor>> {
        Ok(Vec::new())
    }

    fn transform(&self, data: &[Value], _panel: &PanelConfig) -> TransformResult<TableModel> {
        let series = decode(data)?;
        let mut table = TableModel::with_columns(vec![ColumnDescriptor::date("Time")]);

        // (time, one cell per series), keyed by the time's JSON text
        let mut points: Vec<(Value, Vec<Value>)> = Vec::new();
        let mut by_time: HashMap<String, usize> = HashMap::new();

        for (index, s) in series.iter().enumerate() {
            table.columns.push(ColumnDescriptor::new(s.target.clone()));

            for dp in &s.datapoints {
                let slot = *by_time.entry(dp.time().to_string()).or_insert_with(|| {
                    points.push((dp.time().clone(), vec![Value::Null; series.len()]));
                    points.len() - 1
                });
                points[slot].1[index] = dp.value().clone();
            }
        }

        table.rows = points
            .into_iter()
            .map(|(time, values)| std::iter::once(time).chain(values).collect())
            .collect();

        Ok(table)
    }
}

// =============================================================================
// Aggregations
// =============================================================================

/// One row per series with the requested statistics.
///
/// Stats are selected by `panel.columns` (looked up by `value`, falling back
/// to the lower-cased `text`); with no columns selected, `Avg` is shown.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesAggregationsTransformer;

impl TimeSeriesAggregationsTransformer {
    fn stat_columns() -> Vec<ColumnDescriptor> {
        [
            ("Avg", "avg"),
            ("Min", "min"),
            ("Max", "max"),
            ("Total", "total"),
            ("Current", "current"),
            ("Count", "count"),
        ]
        .into_iter()
        .map(|(text, value)| ColumnDescriptor::new(text).with_value(value))
        .collect()
    }
}

impl Transformer for TimeSeriesAggregationsTransformer {
    fn id(&self) -> &'static str {
        "timeseries_aggregations"
    }

    fn description(&self) -> &'static str {
        "Time series aggregations"
    }

    fn columns(&self, _data: &[Value]) -> TransformResult<Vec<ColumnDescriptor>> {
        Ok(Self::stat_columns())
    }

    fn transform(&self, data: &[Value], panel: &PanelConfig) -> TransformResult<TableModel> {
        let series = decode(data)?;

        let selected = if panel.columns.is_empty() {
            vec![ColumnDescriptor::new("Avg").with_value("avg")]
        } else {
            panel.columns.clone()
        };

        let mut table = TableModel::with_columns(vec![ColumnDescriptor::new("Metric")]);
        table
            .columns
            .extend(selected.iter().map(|c| ColumnDescriptor::new(c.text.clone())));

        for s in &series {
            let computed = stats::compute(&s.datapoints);
            let mut row = vec![Value::String(s.target.clone())];
            row.extend(
                selected
                    .iter()
                    .map(|c| computed.get(&c.lookup_key().to_lowercase())),
            );
            table.rows.push(row);
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use serde_json::json;

    fn texts(table: &TableModel) -> Vec<&str> {
        table.columns.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn test_to_rows() {
        let data = vec![json!({"target": "cpu", "datapoints": [[42, 1000], [43, 2000]]})];
        let table = TimeSeriesToRowsTransformer
            .transform(&data, &PanelConfig::new("timeseries_to_rows"))
            .unwrap();
        assert_eq!(texts(&table), vec!["Time", "Metric", "Value"]);
        assert!(table.columns[0].is_date());
        assert_eq!(
            table.rows,
            vec![
                vec![json!(1000), json!("cpu"), json!(42)],
                vec![json!(2000), json!("cpu"), json!(43)],
            ]
        );
    }

    #[test]
    fn test_to_rows_rejects_tables() {
        let data = vec![json!({"type": "table", "columns": [], "rows": []})];
        let err = TimeSeriesToRowsTransformer
            .transform(&data, &PanelConfig::new("timeseries_to_rows"))
            .unwrap_err();
        assert!(matches!(err, TransformError::Format(_)));
    }

    #[test]
    fn test_to_columns_sparse_fill() {
        let data = vec![
            json!({"target": "a", "datapoints": [[1, 1000], [2, 2000]]}),
            json!({"target": "b", "datapoints": [[3, 3000], [4, 1000]]}),
        ];
        let table = TimeSeriesToColumnsTransformer
            .transform(&data, &PanelConfig::new("timeseries_to_columns"))
            .unwrap();
        assert_eq!(texts(&table), vec!["Time", "a", "b"]);
        assert_eq!(
            table.rows,
            vec![
                vec![json!(1000), json!(1), json!(4)],
                vec![json!(2000), json!(2), Value::Null],
                vec![json!(3000), Value::Null, json!(3)],
            ]
        );
    }

    #[test]
    fn test_aggregations_default_avg() {
        let data = vec![json!({"target": "cpu", "datapoints": [[42, 1000], [43, 2000]]})];
        let table = TimeSeriesAggregationsTransformer
            .transform(&data, &PanelConfig::new("timeseries_aggregations"))
            .unwrap();
        assert_eq!(texts(&table), vec!["Metric", "Avg"]);
        assert_eq!(table.rows, vec![vec![json!("cpu"), json!(42.5)]]);
    }

    #[test]
    fn test_aggregations_selected_stats() {
        let data = vec![
            json!({"target": "a", "datapoints": [[1, 1], [null, 2], [5, 3]]}),
            json!({"target": "b", "datapoints": []}),
        ];
        let panel = PanelConfig::new("timeseries_aggregations").with_columns(vec![
            ColumnDescriptor::new("Max").with_value("max"),
            ColumnDescriptor::new("Count"),
            ColumnDescriptor::new("Median").with_value("median"),
        ]);
        let table = TimeSeriesAggregationsTransformer.transform(&data, &panel).unwrap();
        assert_eq!(texts(&table), vec!["Metric", "Max", "Count", "Median"]);
        assert_eq!(table.rows[0], vec![json!("a"), json!(5.0), json!(2), Value::Null]);
        assert_eq!(table.rows[1], vec![json!("b"), Value::Null, json!(0), Value::Null]);
        // The panel itself is left untouched.
        assert_eq!(panel.columns.len(), 3);
    }

    #[test]
    fn test_aggregation_columns() {
        let columns = TimeSeriesAggregationsTransformer.columns(&[]).unwrap();
        assert_eq!(columns.len(), 6);
        assert_eq!(columns[0].lookup_key(), "avg");
    }
}
