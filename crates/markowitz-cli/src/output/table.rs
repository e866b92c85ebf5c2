use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::{format_value, result_of, row_field};

/// Format output as tables: scalar result fields, then the per-asset or
/// per-point rows, then warnings and methodology.
pub fn print_table(value: &Value) {
    println!("{}", render(value));
}

fn render(value: &Value) -> String {
    let result = result_of(value);
    let mut sections: Vec<String> = Vec::new();

    if let Value::Object(map) = result {
        let rows = row_field(result);
        let mut builder = Builder::default();
        builder.push_record(["Field", "Value"]);
        for (key, val) in map {
            if rows.map(|(k, _)| k == key.as_str()).unwrap_or(false) {
                continue;
            }
            match val {
                // Flatten nested objects such as `coefficients` one level.
                Value::Object(inner) => {
                    for (k, v) in inner {
                        builder.push_record([format!("{}.{}", key, k), format_value(v)]);
                    }
                }
                _ => builder.push_record([key.clone(), format_value(val)]),
            }
        }
        sections.push(Table::from(builder).to_string());

        if let Some((_, rows)) = rows {
            sections.push(rows_table(rows));
        }
    } else {
        sections.push(format_value(result));
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            let lines: Vec<String> = warnings
                .iter()
                .filter_map(Value::as_str)
                .map(|s| format!("  - {}", s))
                .collect();
            sections.push(format!("Warnings:\n{}", lines.join("\n")));
        }
    }

    if let Some(Value::String(meth)) = value.get("methodology") {
        sections.push(format!("Methodology: {}", meth));
    }

    sections.join("\n\n")
}

fn rows_table(rows: &[Value]) -> String {
    let headers: Vec<String> = rows
        .first()
        .and_then(Value::as_object)
        .map(|first| first.keys().cloned().collect())
        .unwrap_or_default();

    let mut builder = Builder::default();
    builder.push_record(headers.clone());
    for row in rows {
        let cells: Vec<String> = headers
            .iter()
            .map(|h| row.get(h).map(format_value).unwrap_or_default())
            .collect();
        builder.push_record(cells);
    }
    Table::from(builder).to_string()
}
