//! Summary statistics over a time series.
//!
//! Null (or non-numeric) values are skipped entirely; `count` is the number
//! of points that carried a number.

use serde::Serialize;
use serde_json::{Number, Value};

use crate::models::Datapoint;

/// Statistics for one series. `None` when the series has no numeric values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesStats {
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub total: f64,
    /// Last numeric value.
    pub current: Option<f64>,
    pub count: usize,
}

impl SeriesStats {
    /// Look a stat up by its short name (`"avg"`, `"min"`, ...).
    ///
    /// Unknown names and missing stats yield `Value::Null`.
    pub fn get(&self, name: &str) -> Value {
        let stat = match name {
            "avg" => self.avg,
            "min" => self.min,
            "max" => self.max,
            "total" => Some(self.total),
            "current" => self.current,
            "count" => return Value::from(self.count),
            _ => None,
        };
        stat.and_then(Number::from_f64).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Compute statistics over the numeric values of `datapoints`.
pub fn compute(datapoints: &[Datapoint]) -> SeriesStats {
    let mut stats = SeriesStats::default();

    for value in datapoints.iter().filter_map(|dp| dp.value().as_f64()) {
        stats.total += value;
        stats.count += 1;
        stats.min = Some(stats.min.map_or(value, |m| m.min(value)));
        stats.max = Some(stats.max.map_or(value, |m| m.max(value)));
        stats.current = Some(value);
    }

    if stats.count > 0 {
        stats.avg = Some(stats.total / stats.count as f64);
    }

    stats
}
