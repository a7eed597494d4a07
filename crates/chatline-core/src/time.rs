//! Message timestamps.
//!
//! Timestamps travel as text and are never validated by receivers. Senders
//! stamp messages with local time in ISO-8601 form without an offset, e.g.
//! `2025-03-14T09:26:53.589793`. Renderers may try to shorten a timestamp
//! to a clock label and fall back to nothing when it does not parse.

use chrono::{DateTime, Local, NaiveDateTime};

/// Format used when stamping outgoing messages.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Returns the current local time as a message timestamp.
pub fn timestamp_now() -> String {
    format_timestamp(&Local::now().naive_local())
}

/// Formats a naive local datetime as a message timestamp.
pub fn format_timestamp(at: &NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Extracts an `HH:MM` label from a producer-assigned timestamp.
///
/// Accepts RFC 3339 (with offset, shown in the offset's own wall time) and
/// offset-less ISO-8601 with or without fractional seconds. Returns `None`
/// for anything else.
pub fn clock_label(timestamp: &str) -> Option<String> {
    let trimmed = timestamp.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(at.format("%H:%M").to_string());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|at| at.format("%H:%M").to_string())
}
