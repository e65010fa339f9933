use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{Result, TraceTreeError};

pub fn parse_time_or_relative(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    if let Ok(duration) = humantime::parse_duration(input) {
        return Ok(Utc::now()
            - chrono::Duration::from_std(duration).map_err(|e| {
                TraceTreeError::Parse(format!("failed to parse duration to chrono: {e}"))
            })?);
    }

    Err(TraceTreeError::Parse(format!(
        "expected RFC3339 time or duration, got {input}"
    )))
}

pub fn parse_duration_str(input: &str) -> Result<Duration> {
    humantime::parse_duration(input)
        .map_err(|e| TraceTreeError::Parse(format!("invalid duration {input}: {e}")))
}

/// Span timestamps are microseconds since the Unix epoch.
pub fn micros_to_datetime(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

pub fn format_micros(micros: u64) -> String {
    match micros {
        0..1_000 => format!("{micros}us"),
        1_000..1_000_000 => format!("{:.2}ms", micros as f64 / 1_000.0),
        _ => format!("{:.3}s", micros as f64 / 1_000_000.0),
    }
}
