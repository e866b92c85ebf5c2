use serde_json::Value;
use std::io::{self, Write};

use super::{format_value, result_of, row_field};

/// Write output as CSV to stdout: the per-asset or per-point rows when the
/// result has them, otherwise two-column `field,value` records.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let _ = write_csv(stdout.lock(), value);
}

fn write_csv<W: Write>(out: W, value: &Value) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    let result = result_of(value);

    match (row_field(result), result) {
        (Some((_, rows)), _) => {
            let headers: Vec<String> = rows
                .first()
                .and_then(Value::as_object)
                .map(|first| first.keys().cloned().collect())
                .unwrap_or_default();
            wtr.write_record(&headers)?;
            for row in rows {
                let cells: Vec<String> = headers
                    .iter()
                    .map(|h| row.get(h).map(format_value).unwrap_or_default())
                    .collect();
                wtr.write_record(&cells)?;
            }
        }
        (None, Value::Object(map)) => {
            wtr.write_record(["field", "value"])?;
            for (key, val) in map {
                wtr.write_record([key.as_str(), &format_value(val)])?;
            }
        }
        (None, other) => wtr.write_record([format_value(other)])?,
    }

    wtr.flush()?;
    Ok(())
}
