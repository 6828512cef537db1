//! Due-time parsing. Reminders are stored as `YYYY-MM-DDTHH:MM:SS` local
//! wall-clock strings, so lexical order is chronological order. That only
//! holds for four-digit years, so anything outside 0000-9999 is rejected.

use chrono::{Datelike, Duration, NaiveDateTime};
use regex_lite::Regex;

const STORED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Accepted absolute layouts, tried in order.
const ABSOLUTE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const RELATIVE_PATTERN: &str = r"(?i)^(?:in\s+|\+)?(\d{1,6})\s*(seconds?|secs?|s|minutes?|mins?|m|hours?|hrs?|h|days?|d|weeks?|w)$";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DueParseError {
    #[error("empty due time")]
    Empty,

    #[error("unrecognised due time: {0}")]
    Unrecognised(String),

    #[error("due time out of range: {0}")]
    OutOfRange(String),

    #[error("bad relative-time pattern: {0}")]
    Pattern(String),
}

/// Canonical storage form.
pub fn format_stored(due: NaiveDateTime) -> String {
    due.format(STORED_FORMAT).to_string()
}

/// Reject due times whose stored form would not be four-digit-year text.
pub fn ensure_storable(due: NaiveDateTime) -> Result<NaiveDateTime, DueParseError> {
    if (0..=9999).contains(&due.year()) {
        Ok(due)
    } else {
        Err(DueParseError::OutOfRange(format_stored(due)))
    }
}

/// Parse a value read back from the store.
pub fn parse_stored(raw: &str) -> Result<NaiveDateTime, DueParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DueParseError::Empty);
    }
    let due = ABSOLUTE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| DueParseError::Unrecognised(raw.to_string()))?;
    ensure_storable(due)
}

/// Parse a user- or planner-supplied due expression relative to `now`.
///
/// Accepts absolute local times (see [`parse_stored`]), RFC 3339 timestamps
/// with an offset (converted to local wall clock), and offsets such as
/// `in 30 minutes`, `+2h` or `1 day`.
pub fn parse_expression(input: &str, now: NaiveDateTime) -> Result<NaiveDateTime, DueParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(DueParseError::Empty);
    }

    match parse_stored(input) {
        Ok(due) => return Ok(due),
        Err(e @ DueParseError::OutOfRange(_)) => return Err(e),
        Err(_) => {}
    }

    if let Ok(with_offset) = chrono::DateTime::parse_from_rfc3339(input) {
        return ensure_storable(with_offset.with_timezone(&chrono::Local).naive_local());
    }

    let re = Regex::new(RELATIVE_PATTERN).map_err(|e| DueParseError::Pattern(e.to_string()))?;
    let caps = re
        .captures(input)
        .ok_or_else(|| DueParseError::Unrecognised(input.to_string()))?;

    let amount: i64 = caps[1]
        .parse()
        .map_err(|_| DueParseError::OutOfRange(input.to_string()))?;
    let unit = caps[2].to_ascii_lowercase();
    let offset = match unit.chars().next() {
        Some('s') => Duration::seconds(amount),
        Some('m') => Duration::minutes(amount),
        Some('h') => Duration::hours(amount),
        Some('d') => Duration::days(amount),
        Some('w') => Duration::weeks(amount),
        _ => return Err(DueParseError::Unrecognised(input.to_string())),
    };

    now.checked_add_signed(offset)
        .ok_or_else(|| DueParseError::OutOfRange(input.to_string()))
        .and_then(ensure_storable)
}
