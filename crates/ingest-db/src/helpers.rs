//! Row-to-value parsing helpers shared by the repositories.

use chrono::{DateTime, Utc};

use crate::error::DbError;

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 and `SQLite`'s `strftime('%Y-%m-%dT%H:%M:%fZ', ...)` format,
/// which are the same shape here but kept as two parse attempts for resilience
/// against a future column written by a different formatter.
///
/// # Errors
///
/// Returns [`DbError::Query`] if the string matches neither format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DbError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DbError::Query(format!("failed to parse datetime '{s}': {e}")))
}

/// # Errors
///
/// Returns [`DbError::Query`] if a present value cannot be parsed.
pub fn parse_optional_datetime(s: Option<&str>) -> Result<Option<DateTime<Utc>>, DbError> {
    match s {
        Some(s) if !s.is_empty() => Ok(Some(parse_datetime(s)?)),
        _ => Ok(None),
    }
}

/// Read a nullable TEXT column, treating both SQL NULL and `""` as absent.
///
/// # Errors
///
/// Returns [`DbError`] if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DbError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// # Errors
///
/// Returns [`DbError::Query`] if the column contains invalid JSON.
pub fn parse_json<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DbError> {
    serde_json::from_str(s).map_err(|e| DbError::Query(format!("invalid JSON column: {e}")))
}
