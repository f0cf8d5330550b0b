//! Shared helper functions for CLI commands

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Latest accepted timestamp (2100-01-01T00:00:00Z)
const MAX_TIMESTAMP: i64 = 4_102_444_800;

/// Truncate a string to max_len characters, adding "..." if truncated
///
/// Useful for table columns that need bounded width.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Render a JSON value as a single table cell
///
/// Strings are shown without quotes, `null` as empty, and arrays/objects
/// as compact JSON on one line.
pub fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.replace('\n', " "),
        Some(other) => other.to_string(),
    }
}

/// Parse a date filter given as epoch seconds or ISO 8601
///
/// Dates and datetimes without an offset are taken as UTC.
pub fn parse_timestamp(s: &str) -> Result<i64, String> {
    let s = s.trim();
    let timestamp = if let Ok(epoch) = s.parse::<i64>() {
        epoch
    } else if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        dt.timestamp()
    } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        dt.and_utc().timestamp()
    } else if let Some(dt) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        dt.and_utc().timestamp()
    } else {
        return Err(format!(
            "Invalid datetime '{}'. Use ISO 8601 (e.g. 2024-01-01T00:00:00Z) or epoch seconds",
            s
        ));
    };

    if !(0..=MAX_TIMESTAMP).contains(&timestamp) {
        return Err(format!("Timestamp out of range (1970 to 2100): '{}'", s));
    }
    Ok(timestamp)
}

/// Split a `key=value` argument at the first `=`
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("Invalid '{}'. Use key=value", s)),
    }
}

/// Interpret a command-line value as JSON when it parses, else as a string
pub fn json_or_string(value: &str) -> Value {
    serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
}
