//! Parsing of loosely typed request values (ids, dates, enums).
//!
//! Browser forms send everything as text, so these helpers turn raw
//! strings into domain values with user-facing error messages.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::error::ApiError;

/// Query parameters shared by every action.
#[derive(Debug, Default, Deserialize)]
pub struct ActionQuery {
    pub action: Option<String>,
    pub id: Option<String>,
    pub q: Option<String>,
    pub status: Option<String>,
    pub department: Option<String>,
    pub file: Option<String>,
}

/// Parse a ticket id. Only positive integers are valid.
pub fn parse_id(raw: Option<&str>) -> Result<i64, ApiError> {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|id| *id > 0)
        .ok_or_else(|| ApiError::BadRequest("invalid id".to_string()))
}

/// Parse a due date.
///
/// Accepts:
/// - RFC 3339 with timezone: `2024-01-15T10:30:00Z`
/// - Browser datetime-local: `2024-01-15T10:30`, `2024-01-15T10:30:00`
/// - Space separated: `2024-01-15 10:30`, `2024-01-15 10:30:00`
/// - Date only (midnight UTC): `2024-01-15`
///
/// Naive values are taken as UTC. Blank input means no date.
pub fn parse_end_at(raw: &str) -> Result<Option<DateTime<Utc>>, ApiError> {
    let s = raw.trim();
    if s.is_empty() {
        return Ok(None);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.with_timezone(&Utc)));
    }

    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ];
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(Some(naive.and_utc()));
        }
    }

    if let Some(midnight) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(Some(midnight.and_utc()));
    }

    Err(ApiError::BadRequest(format!(
        "Invalid end_at '{}'. Expected YYYY-MM-DD, YYYY-MM-DD HH:MM or RFC 3339",
        s
    )))
}

/// Parse an optional enum filter or field; blank means absent.
pub fn parse_optional<T>(raw: Option<&str>) -> Result<Option<T>, ApiError>
where
    T: std::str::FromStr<Err = helpdesk_core::Error>,
{
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(ApiError::from),
    }
}
