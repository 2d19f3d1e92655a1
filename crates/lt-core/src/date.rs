//! Timestamp formats and date parsing.
//!
//! The log file records wall-clock minutes with no timezone, so everything
//! here works on `NaiveDateTime`. Two parsers live here: the strict one the
//! log parser uses to tell timestamp lines from description lines, and a
//! flexible one for query slice bounds which also accepts relative keywords.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use thiserror::Error;

/// Timestamp format used by log lines and serialization.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Date-only format accepted in query slice bounds (implicit midnight).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A string that cannot be read as a date.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("not a date: {text:?}")]
pub struct DateError {
    pub text: String,
}

/// Parses a log-file timestamp line (`YYYY-MM-DD HH:MM`).
///
/// Returns `None` on failure: the log parser distinguishes timestamp lines
/// from description lines purely by this parse failing.
#[must_use]
pub fn parse_timestamp(line: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(line.trim(), DATETIME_FORMAT).ok()
}

/// Parses a flexible date literal for query slice bounds.
///
/// Accepts the keywords `now`, `today`, `tomorrow` and `yesterday`
/// (resolved against the injected `now`), an ISO date (implicit midnight),
/// or an ISO datetime.
pub fn parse_flexible(text: &str, now: NaiveDateTime) -> Result<NaiveDateTime, DateError> {
    let text = text.trim();
    match text {
        "now" => return Ok(now),
        "today" => return Ok(midnight(now.date())),
        "tomorrow" => return Ok(midnight(now.date() + Duration::days(1))),
        "yesterday" => return Ok(midnight(now.date() - Duration::days(1))),
        _ => {}
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(text, DATETIME_FORMAT) {
        return Ok(dt);
    }
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        return Ok(midnight(date));
    }
    Err(DateError {
        text: text.to_string(),
    })
}

/// Midnight at the start of `date`.
#[must_use]
pub fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Start of the calendar day after `t`. Usable as a slicing boundary step.
#[must_use]
pub fn next_day_start(t: NaiveDateTime) -> NaiveDateTime {
    midnight(t.date() + Duration::days(1))
}

/// Start of the calendar week (Monday) after `t`.
#[must_use]
pub fn next_week_start(t: NaiveDateTime) -> NaiveDateTime {
    let days_ahead = 7 - i64::from(t.date().weekday().num_days_from_monday());
    midnight(t.date() + Duration::days(days_ahead))
}

/// Start of the calendar month after `t`.
#[must_use]
pub fn next_month_start(t: NaiveDateTime) -> NaiveDateTime {
    let (year, month) = if t.date().month() == 12 {
        (t.date().year() + 1, 1)
    } else {
        (t.date().year(), t.date().month() + 1)
    };
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("first of month is a valid date");
    midnight(first)
}
