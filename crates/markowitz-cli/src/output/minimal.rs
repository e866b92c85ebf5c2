use serde_json::Value;
use std::io::{self, Write};

use super::{format_value, result_of, row_field};

/// Print just the key answer: one line per asset weight for an allocation,
/// one `return,risk` line per frontier point.
pub fn print_minimal(value: &Value) {
    let stdout = io::stdout();
    let _ = write_minimal(&mut stdout.lock(), value);
}

fn write_minimal<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    let result = result_of(value);

    match row_field(result) {
        Some(("weights", rows)) => {
            for row in rows {
                writeln!(out, "{} {}", field(row, "name"), field(row, "weight"))?;
            }
        }
        Some((_, rows)) => {
            for row in rows {
                writeln!(out, "{},{}", field(row, "expected_return"), field(row, "risk"))?;
            }
        }
        None => writeln!(out, "{}", format_value(result))?,
    }
    Ok(())
}

fn field(row: &Value, key: &str) -> String {
    row.get(key).map(format_value).unwrap_or_default()
}
