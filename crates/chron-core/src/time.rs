//! Timestamp parsing and the canonical stored form.
//!
//! Producers send ISO-8601 strings with or without an offset. The audit log
//! stores one fixed-width UTC form so that string order equals time order.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Best-effort parse of a producer timestamp.
///
/// Accepts RFC 3339 (`2024-01-01T10:00:00.123Z`, `...+02:00`) and ISO-8601
/// without an offset (`2024-01-01T10:00:00`, read as UTC). Returns `None` for
/// anything else; the caller decides the fallback.
#[must_use]
pub fn parse_event_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Format a timestamp for storage: RFC 3339, UTC, microsecond precision, `Z`.
#[must_use]
pub fn to_storage_string(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// The UTC day a timestamp belongs to, used as the audit log partition key.
#[must_use]
pub fn partition_day(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d").to_string()
}
