pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Result fields holding one row per asset or per frontier point.
const ROW_FIELDS: [&str; 2] = ["weights", "points"];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The `result` object of a computation envelope, or the value itself.
fn result_of(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value)
}

/// First row-shaped field (array of objects) in a result object.
fn row_field(result: &Value) -> Option<(&'static str, &[Value])> {
    let map = result.as_object()?;
    ROW_FIELDS.iter().find_map(|key| match map.get(*key) {
        Some(Value::Array(rows)) if rows.iter().all(Value::is_object) && !rows.is_empty() => {
            Some((*key, rows.as_slice()))
        }
        _ => None,
    })
}

/// Render a scalar or compound value as a single cell.
fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        Value::Object(_) => serde_json::to_string(value).unwrap_or_default(),
    }
}
