use serde_json::Value;
use std::io::{self, Read};

/// Attempt to read a JSON (or YAML) document from stdin if data is being piped.
/// Returns None if stdin is a TTY (interactive).
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_document(&buffer)
}

/// A leading `{` or `[` means JSON; anything else is read as YAML. The error
/// reported is the one from the format that was attempted.
fn parse_document(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
            .map(Some)
            .map_err(|e| -> Box<dyn std::error::Error> {
                format!("Failed to parse stdin as JSON: {}", e).into()
            })
    } else {
        serde_yaml::from_str(trimmed)
            .map(Some)
            .map_err(|e| -> Box<dyn std::error::Error> {
                format!("Failed to parse stdin as YAML: {}", e).into()
            })
    }
}
