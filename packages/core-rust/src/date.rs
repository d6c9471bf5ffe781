//! Date normalization and display formatting.
//!
//! Date fields receive heterogeneous input: a native date, a full ISO
//! timestamp, a date-only string, or a time-only string. Everything is
//! normalized to a [`NaiveDateTime`] before validation or display.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::types::Value;

/// How a date field is presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateMode {
    /// Calendar date only: `12/01/2026`.
    #[default]
    Date,
    /// Time of day only: `03:30 PM`.
    Time,
    /// Date and time: `12/01/2026, 03:30 PM`.
    Datetime,
}

impl DateMode {
    /// `strftime` pattern used for display.
    #[must_use]
    pub fn display_format(self) -> &'static str {
        match self {
            Self::Date => "%d/%m/%Y",
            Self::Time => "%I:%M %p",
            Self::Datetime => "%d/%m/%Y, %I:%M %p",
        }
    }
}

const DATETIME_PATTERNS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y, %I:%M %p",
];
const DATE_PATTERNS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];
const TIME_PATTERNS: &[&str] = &["%H:%M:%S", "%I:%M %p"];

/// Normalizes `value` to a date-time, resolving time-only input against today.
#[must_use]
pub fn normalize_to_date(value: &Value) -> Option<NaiveDateTime> {
    normalize_to_date_on(value, Local::now().date_naive())
}

/// Normalizes `value` to a date-time, resolving time-only input against `today`.
///
/// Accepted shapes, tried in order:
/// 1. a native [`Value::Date`]
/// 2. a full ISO timestamp; an explicit offset keeps its own wall-clock time
/// 3. a date-only string (`2026-01-12`), at midnight
/// 4. a time-only string (`15:30:00`), on `today`
///
/// The display formats of [`DateMode`] are accepted as well, so formatted
/// output normalizes back to the same calendar date.
#[must_use]
pub fn normalize_to_date_on(value: &Value, today: NaiveDate) -> Option<NaiveDateTime> {
    match value {
        Value::Date(d) => Some(*d),
        Value::String(s) => parse_str(s.trim(), today),
        _ => None,
    }
}

fn parse_str(s: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    if s.is_empty() {
        return None;
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(s) {
        return Some(with_offset.naive_local());
    }
    for pattern in DATETIME_PATTERNS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, pattern) {
            return Some(dt);
        }
    }
    for pattern in DATE_PATTERNS {
        if let Ok(d) = NaiveDate::parse_from_str(s, pattern) {
            return Some(d.and_time(NaiveTime::MIN));
        }
    }
    for pattern in TIME_PATTERNS {
        if let Ok(t) = NaiveTime::parse_from_str(s, pattern) {
            return Some(today.and_time(t));
        }
    }
    None
}

/// Formats `value` for display, or returns an empty string if it is not a date.
#[must_use]
pub fn format_for_display(value: &Value, mode: DateMode) -> String {
    normalize_to_date(value)
        .map(|d| d.format(mode.display_format()).to_string())
        .unwrap_or_default()
}
