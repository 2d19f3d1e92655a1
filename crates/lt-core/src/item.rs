//! The atomic interval record: one contiguous span of time spent on a task.

use std::fmt;

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

use crate::date::DATETIME_FORMAT;

/// Character separating tags in a description line.
pub const TAG_SEPARATOR: char = '/';

/// Separator used when rendering a tag path back to text.
pub const WHITESPACED_TAG_SEPARATOR: &str = " / ";

/// Validation errors for intervals.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The interval would end before it starts.
    #[error("interval ends before it starts: {end} < {start}")]
    EndBeforeStart {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
}

/// One contiguous span of time with an ordered tag path.
///
/// Immutable after construction; operations that change an item
/// (`cut_to_dates`, `with_tags`) return a new value. An *open* item is a
/// task still in progress: its `end` holds the clock reading injected at
/// parse time and `ended` is false.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogItem {
    start: NaiveDateTime,
    end: NaiveDateTime,
    ended: bool,
    tags: Vec<String>,
}

impl LogItem {
    /// Creates a closed interval. Fails when `end < start`.
    pub fn closed(
        start: NaiveDateTime,
        end: NaiveDateTime,
        tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, ValidationError> {
        if end < start {
            return Err(ValidationError::EndBeforeStart { start, end });
        }
        Ok(Self {
            start,
            end,
            ended: true,
            tags: clean_tags(tags),
        })
    }

    /// Creates an open interval for a task still in progress.
    ///
    /// `now` is the injected clock reading; it becomes the provisional end
    /// used for duration and window tests.
    pub fn open(
        start: NaiveDateTime,
        now: NaiveDateTime,
        tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, ValidationError> {
        if now < start {
            return Err(ValidationError::EndBeforeStart { start, end: now });
        }
        Ok(Self {
            start,
            end: now,
            ended: false,
            tags: clean_tags(tags),
        })
    }

    #[must_use]
    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// The end of the interval; for an open item this is the clock reading
    /// captured at construction.
    #[must_use]
    pub const fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Whether the interval was explicitly closed.
    #[must_use]
    pub const fn ended(&self) -> bool {
        self.ended
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// The tag at `index`, if the tag path is long enough.
    #[must_use]
    pub fn tag(&self, index: usize) -> Option<&str> {
        self.tags.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// The tag path joined with `" / "`.
    #[must_use]
    pub fn description(&self) -> String {
        self.tags.join(WHITESPACED_TAG_SEPARATOR)
    }

    /// Returns a copy with the same span and a different tag path.
    #[must_use]
    pub fn with_tags(&self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            start: self.start,
            end: self.end,
            ended: self.ended,
            tags: clean_tags(tags),
        }
    }

    /// Clips the interval to `[start, stop]`, either bound optional.
    ///
    /// Returns `None` when the interval does not overlap the window at all.
    /// A full overlap returns the item unchanged; a partial overlap returns
    /// a new item with the overhanging bound replaced. The original is
    /// never mutated. An open item stays open unless the stop bound
    /// actually truncates it, in which case the clipped end is definite.
    #[must_use]
    pub fn cut_to_dates(
        &self,
        start: Option<NaiveDateTime>,
        stop: Option<NaiveDateTime>,
    ) -> Option<Self> {
        if stop.is_some_and(|stop| stop < self.start) {
            return None;
        }
        if start.is_some_and(|start| start > self.end) {
            return None;
        }
        Some(Self {
            start: start.map_or(self.start, |s| s.max(self.start)),
            end: stop.map_or(self.end, |s| s.min(self.end)),
            ended: self.ended || stop.is_some_and(|s| s < self.end),
            tags: self.tags.clone(),
        })
    }

    /// True when the interval overlaps `[start, stop]`, either bound optional.
    #[must_use]
    pub fn overlaps(&self, start: Option<NaiveDateTime>, stop: Option<NaiveDateTime>) -> bool {
        start.is_none_or(|s| self.end >= s) && stop.is_none_or(|s| self.start <= s)
    }
}

fn clean_tags(tags: impl IntoIterator<Item = impl Into<String>>) -> Vec<String> {
    tags.into_iter()
        .map(|t| t.into().trim().to_string())
        .collect()
}

impl fmt::Display for LogItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n{}\n{}",
            self.start.format(DATETIME_FORMAT),
            self.description(),
            self.end.format(DATETIME_FORMAT),
        )
    }
}
