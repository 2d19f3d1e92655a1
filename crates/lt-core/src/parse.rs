//! Line-oriented parsing of the log text.
//!
//! The format alternates between timestamp lines (`YYYY-MM-DD HH:MM`) and
//! description lines (a tag path joined by `/`). The end of one entry is the
//! start of the next, so a closed entry's end line doubles as the following
//! entry's start line. A file ending on a description denotes a task still
//! in progress. Comment lines (`# `) are skipped by the interval parser but
//! scanned separately by [`Variables`] for `key = value` assignments.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use crate::date::parse_timestamp;
use crate::item::{LogItem, TAG_SEPARATOR, ValidationError};

/// Prefix marking a comment line.
pub const COMMENT_PREFIX: &str = "# ";

/// Errors raised while looking up goal variables.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VariablesError {
    /// None of the fallback keys is assigned in the log text.
    #[error("no matching variable for keys: {keys:?}")]
    NoMatchingKey { keys: Vec<String> },

    /// The assigned value is not a whole number of hours.
    #[error("variable {key:?} is not a number of hours: {value:?}")]
    InvalidHours { key: String, value: String },
}

/// Parses log text into intervals.
///
/// `now` is the injected clock reading used as the provisional end of a
/// trailing open entry. Fails when two consecutive timestamps run backwards.
pub fn parse_log(text: &str, now: NaiveDateTime) -> Result<Vec<LogItem>, ValidationError> {
    let mut items = Vec::new();
    let mut start: Option<NaiveDateTime> = None;
    let mut end: Option<NaiveDateTime> = None;
    let mut description: Option<&str> = None;

    for line in text.lines() {
        if line.starts_with(COMMENT_PREFIX) {
            continue;
        }
        if let Some(timestamp) = parse_timestamp(line) {
            if start.is_some() && description.is_some() {
                end = Some(timestamp);
            } else {
                start = Some(timestamp);
            }
        } else if !line.trim().is_empty() {
            description = Some(line);
        }
        if let (Some(s), Some(e), Some(d)) = (start, end, description) {
            items.push(LogItem::closed(s, e, d.split(TAG_SEPARATOR))?);
            // Entries are contiguous: this end opens the next entry.
            start = Some(e);
            end = None;
            description = None;
        }
    }
    if let (Some(s), Some(d)) = (start, description) {
        items.push(LogItem::open(s, now, d.split(TAG_SEPARATOR))?);
    }
    tracing::debug!(items = items.len(), "parsed log text");
    Ok(items)
}

/// Goal configuration parsed out of `# key = value` comment lines.
///
/// Read-only lookup with a fallback key list, so a specific goal
/// (`week 2016-38`) can override a general one (`week`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    variables: HashMap<String, String>,
}

impl Variables {
    /// Scans the full log text for variable assignments.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let variables = text
            .lines()
            .filter_map(|line| line.strip_prefix(COMMENT_PREFIX))
            .filter_map(|rest| {
                let (key, value) = rest.split_once(" = ")?;
                Some((key.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        Self { variables }
    }

    /// Raw lookup of a single key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.variables.get(key).map(String::as_str)
    }

    /// Resolves the first assigned key in `keys` as a number of goal hours.
    pub fn hours(&self, keys: &[&str]) -> Result<Duration, VariablesError> {
        for key in keys {
            if let Some(value) = self.variables.get(*key) {
                let hours: i64 =
                    value
                        .parse()
                        .map_err(|_| VariablesError::InvalidHours {
                            key: (*key).to_string(),
                            value: value.clone(),
                        })?;
                return Ok(Duration::hours(hours));
            }
        }
        Err(VariablesError::NoMatchingKey {
            keys: keys.iter().map(ToString::to_string).collect(),
        })
    }
}
