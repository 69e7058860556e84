//! Row parsing helpers shared by the repositories.

use chrono::{DateTime, Utc};

use crate::error::DatabaseError;

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 (`"2026-02-09T14:30:00.000000Z"`) and `SQLite`'s default
/// format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// `row.get::<String>(idx)` on a NULL column returns an error, not `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Read a nullable TEXT column, mapping NULL to `""`.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_string_or_empty(row: &libsql::Row, idx: i32) -> Result<String, DatabaseError> {
    Ok(row.get::<Option<String>>(idx)?.unwrap_or_default())
}

/// Read a `COUNT(*)` column as an unsigned count.
///
/// # Errors
///
/// Returns `DatabaseError::Query` for a negative value.
pub fn get_count(row: &libsql::Row, idx: i32) -> Result<u64, DatabaseError> {
    let n = row.get::<i64>(idx)?;
    u64::try_from(n).map_err(|_| DatabaseError::Query(format!("negative count {n}")))
}

/// Bind an empty string as SQL NULL.
#[must_use]
pub fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() { None } else { Some(s) }
}
