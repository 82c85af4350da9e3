//! Rendering a [`TableModel`] for the command line.
//!
//! | Format | Content                                                   |
//! |--------|-----------------------------------------------------------|
//! | json   | `{"columns": [...], "rows": [...]}`                       |
//! | csv    | header of column names, one record per row                |
//! | text   | aligned grid; `date` columns shown as UTC date-times      |

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde_json::Value;
use std::path::Path;

use crate::error::OutputResult;
use crate::models::{ColumnDescriptor, TableModel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Text,
}

/// Render `table` in `format`.
pub fn render(table: &TableModel, format: OutputFormat) -> OutputResult<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(table)?),
        OutputFormat::Csv => render_csv(table),
        OutputFormat::Text => Ok(render_text(table)),
    }
}

/// Write the rendering to `output`, or stdout when `None`.
pub fn write_output(table: &TableModel, format: OutputFormat, output: Option<&Path>) -> OutputResult<()> {
    let rendered = render(table, format)?;
    match output {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{}", rendered),
    }
    Ok(())
}

/// Plain-text form of a cell: strings unquoted, null empty.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Epoch milliseconds as a UTC date-time, when representable.
pub fn format_timestamp(value: &Value) -> Option<String> {
    let millis = value.as_i64().or_else(|| value.as_f64().map(|f| f as i64))?;
    DateTime::<Utc>::from_timestamp_millis(millis).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn display_cell(column: Option<&ColumnDescriptor>, value: &Value) -> String {
    if column.is_some_and(ColumnDescriptor::is_date) {
        if let Some(formatted) = format_timestamp(value) {
            return formatted;
        }
    }
    cell_text(value)
}

fn render_csv(table: &TableModel) -> OutputResult<String> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
    writer.write_record(table.columns.iter().map(|c| c.text.as_str()))?;
    for row in &table.rows {
        writer.write_record(row.iter().map(cell_text))?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn render_text(table: &TableModel) -> String {
    let header: Vec<String> = table.columns.iter().map(|c| c.text.clone()).collect();
    let body: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, v)| display_cell(table.columns.get(i), v))
                .collect()
        })
        .collect();

    let width_count = body.iter().map(Vec::len).chain([header.len()]).max().unwrap_or(0);
    let mut widths = vec![0; width_count];
    for line in std::iter::once(&header).chain(&body) {
        for (i, cell) in line.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let format_line = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, cell)| format!("{:<width$}", cell, width = widths[i]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format_line(&header)];
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join("  "),
    );
    lines.extend(body.iter().map(|row| format_line(row)));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TableModel {
        TableModel {
            columns: vec![
                ColumnDescriptor::date("Time"),
                ColumnDescriptor::new("Metric"),
                ColumnDescriptor::new("Value"),
            ],
            rows: vec![
                vec![json!(0), json!("cpu, total"), json!(42)],
                vec![json!(60000), json!("mem"), Value::Null],
            ],
        }
    }

    #[test]
    fn test_json() {
        let out = render(&sample(), OutputFormat::Json).unwrap();
        let parsed: TableModel = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_csv() {
        let out = render(&sample(), OutputFormat::Csv).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "Time,Metric,Value");
        assert_eq!(lines[1], "0,\"cpu, total\",42");
        assert_eq!(lines[2], "60000,mem,");
    }

    #[test]
    fn test_text_formats_dates() {
        let out = render(&sample(), OutputFormat::Text).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert!(lines[0].starts_with("Time"));
        assert!(lines[1].starts_with("---"));
        assert!(lines[2].starts_with("1970-01-01 00:00:00"));
        assert!(lines[3].starts_with("1970-01-01 00:01:00  mem"));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(&json!(1000)), Some("1970-01-01 00:00:01".to_string()));
        assert_eq!(format_timestamp(&json!("soon")), None);
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("table.csv");
        write_output(&sample(), OutputFormat::Csv, Some(&path)).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Time,Metric,Value"));
    }
}
