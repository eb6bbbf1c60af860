//! Output formatting for diff records

use crate::decode::DiffRecord;
use crate::error::Result;
use crate::value::{Row, Value};
use serde::Serialize;

/// Turns diff records into text
///
/// `header` is emitted once before the first record when it returns a
/// non-empty string.
pub trait Formatter: Send + Sync {
    fn header(&self, _source_table: &str, _dest_table: &str) -> Option<String> {
        None
    }

    fn format(&self, record: &DiffRecord, source_table: &str, dest_table: &str) -> Result<String>;
}

/// Human-readable tree output
#[derive(Debug, Clone, Copy, Default)]
pub struct PrettyFormatter;

impl Formatter for PrettyFormatter {
    fn header(&self, source_table: &str, dest_table: &str) -> Option<String> {
        Some(format!("🔍 Row differences: {} → {}", source_table, dest_table))
    }

    fn format(&self, record: &DiffRecord, source_table: &str, dest_table: &str) -> Result<String> {
        let mut out = format!("├─ Row {}", record.id);

        match (&record.source_diff, &record.dest_diff) {
            (None, Some(dest)) => {
                out.push_str(&format!("\n│  └─ ➕ only in {}", dest_table));
                push_values(&mut out, dest);
            }
            (Some(source), None) => {
                out.push_str(&format!("\n│  └─ ➖ only in {}", source_table));
                push_values(&mut out, source);
            }
            (Some(source), Some(dest)) => {
                let mut columns: Vec<&String> = source.keys().collect();
                for column in dest.keys() {
                    if !source.contains_key(column) {
                        columns.push(column);
                    }
                }

                if columns.is_empty() {
                    out.push_str("\n│  └─ (no column differences)");
                }
                for (i, column) in columns.iter().enumerate() {
                    let marker = if i == columns.len() - 1 { "└─" } else { "├─" };
                    let before = value_or_null(source.get(*column).or_else(|| record.source_row.get(*column)));
                    let after = value_or_null(dest.get(*column).or_else(|| record.dest_row.get(*column)));
                    out.push_str(&format!("\n│  {} {}: '{}' → '{}'", marker, column, before, after));
                }
            }
            (None, None) => out.push_str("\n│  └─ (no row on either side)"),
        }

        Ok(out)
    }
}

fn push_values(out: &mut String, values: &Row) {
    for (i, (column, value)) in values.iter().enumerate() {
        let marker = if i == values.len() - 1 { "└─" } else { "├─" };
        out.push_str(&format!("\n│     {} {}: '{}'", marker, column, value));
    }
}

fn value_or_null(value: Option<&Value>) -> String {
    value.map_or_else(|| Value::Null.to_string(), ToString::to_string)
}

/// Machine-readable output: one JSON object per record (JSON Lines)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonLine<'a> {
    source_table: &'a str,
    dest_table: &'a str,
    #[serde(flatten)]
    record: &'a DiffRecord,
}

impl Formatter for JsonFormatter {
    fn format(&self, record: &DiffRecord, source_table: &str, dest_table: &str) -> Result<String> {
        let line = JsonLine {
            source_table,
            dest_table,
            record,
        };
        Ok(serde_json::to_string(&line)?)
    }
}

/// Parse output format string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}
