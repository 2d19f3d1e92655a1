//! An ordered collection of intervals with filter/map/slice/sum.
//!
//! A [`Log`] is order-preserving for serialization but compares as a set:
//! two logs are equal when they hold the same items, regardless of order.
//! All operations are pure and return new logs.

use std::collections::HashSet;
use std::fmt;

use chrono::{Duration, NaiveDateTime};

use crate::item::{LogItem, ValidationError};
use crate::parse::parse_log;
use crate::query::{self, Query, QueryError};

/// How to advance from one sub-interval boundary to the next when slicing
/// a log into periods.
#[derive(Debug, Clone, Copy)]
pub enum SliceStep {
    /// A fixed duration per sub-interval.
    Fixed(Duration),
    /// A function mapping a timestamp to the next boundary, e.g. the start
    /// of the next calendar day.
    Boundary(fn(NaiveDateTime) -> NaiveDateTime),
}

impl SliceStep {
    fn next(self, current: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Fixed(duration) => current + duration,
            Self::Boundary(f) => f(current),
        }
    }
}

/// One sub-interval produced by [`Log::slice_periods`].
#[derive(Debug, Clone, PartialEq)]
pub struct LogSlice {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub log: Log,
}

/// An ordered, immutable collection of [`LogItem`]s.
#[derive(Debug, Clone, Default, Eq)]
pub struct Log {
    items: Vec<LogItem>,
}

impl Log {
    /// Parses raw log text, using `now` as the provisional end of a
    /// trailing open entry.
    pub fn from_text(text: &str, now: NaiveDateTime) -> Result<Self, ValidationError> {
        Ok(Self {
            items: parse_log(text, now)?,
        })
    }

    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = LogItem>) -> Self {
        Self {
            items: items.into_iter().collect(),
        }
    }

    #[must_use]
    pub fn items(&self) -> &[LogItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LogItem> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Keeps the items satisfying `predicate`.
    #[must_use]
    pub fn filter_items(&self, predicate: impl Fn(&LogItem) -> bool) -> Self {
        Self::from_items(self.items.iter().filter(|i| predicate(i)).cloned())
    }

    /// Filters by query text, resolving relative dates against `now`.
    pub fn filter(&self, query_text: &str, now: NaiveDateTime) -> Result<Self, QueryError> {
        Ok(query::parse(query_text, now)?.filter(self))
    }

    /// Filters by an already-parsed query.
    #[must_use]
    pub fn filter_query(&self, query: &Query) -> Self {
        query.filter(self)
    }

    #[must_use]
    pub fn map(&self, f: impl Fn(&LogItem) -> LogItem) -> Self {
        Self::from_items(self.items.iter().map(f))
    }

    /// Clips every item to `[start, stop]`, dropping items with no overlap.
    #[must_use]
    pub fn cut(&self, start: Option<NaiveDateTime>, stop: Option<NaiveDateTime>) -> Self {
        Self::from_items(self.items.iter().filter_map(|i| i.cut_to_dates(start, stop)))
    }

    /// Splits the log into consecutive sub-intervals of `step`, each
    /// holding the log clipped to it.
    ///
    /// Open `start`/`stop` default to the log's overall bounds; an empty
    /// log with open bounds yields no periods. The last sub-interval's
    /// upper bound is clamped to `stop` even when the step overshoots.
    #[must_use]
    pub fn slice_periods(
        &self,
        start: Option<NaiveDateTime>,
        stop: Option<NaiveDateTime>,
        step: SliceStep,
    ) -> Vec<LogSlice> {
        let (Some(start), Some(stop)) = (start.or_else(|| self.get_start()), stop.or_else(|| self.get_end()))
        else {
            return Vec::new();
        };
        let mut slices = Vec::new();
        let mut current = start;
        while current < stop {
            let next = step.next(current);
            if next <= current {
                // A non-advancing step would loop forever.
                break;
            }
            let end = next.min(stop);
            slices.push(LogSlice {
                start: current,
                end,
                log: self.cut(Some(current), Some(end)),
            });
            current = next;
        }
        slices
    }

    /// Total duration across all items; zero for an empty log.
    #[must_use]
    pub fn sum(&self) -> Duration {
        self.items
            .iter()
            .fold(Duration::zero(), |acc, i| acc + i.duration())
    }

    /// A copy sorted by `key`, descending when `reverse` is set. The sort
    /// is stable in both directions: items with equal keys keep their
    /// relative order from the log.
    #[must_use]
    pub fn sorted_by_key<K: Ord>(&self, key: impl Fn(&LogItem) -> K, reverse: bool) -> Self {
        let mut items = self.items.clone();
        if reverse {
            items.sort_by(|a, b| key(b).cmp(&key(a)));
        } else {
            items.sort_by(|a, b| key(a).cmp(&key(b)));
        }
        Self { items }
    }

    /// Earliest start across items, `None` for an empty log.
    #[must_use]
    pub fn get_start(&self) -> Option<NaiveDateTime> {
        self.items.iter().map(LogItem::start).min()
    }

    /// Latest end across items, `None` for an empty log.
    #[must_use]
    pub fn get_end(&self) -> Option<NaiveDateTime> {
        self.items.iter().map(LogItem::end).max()
    }
}

impl PartialEq for Log {
    fn eq(&self, other: &Self) -> bool {
        let left: HashSet<&LogItem> = self.items.iter().collect();
        let right: HashSet<&LogItem> = other.items.iter().collect();
        left == right
    }
}

impl FromIterator<LogItem> for Log {
    fn from_iter<T: IntoIterator<Item = LogItem>>(iter: T) -> Self {
        Self::from_items(iter)
    }
}

impl<'a> IntoIterator for &'a Log {
    type Item = &'a LogItem;
    type IntoIter = std::slice::Iter<'a, LogItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl IntoIterator for Log {
    type Item = LogItem;
    type IntoIter = std::vec::IntoIter<LogItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Renders the log back to text.
///
/// Each block is a start line, a tag line, and conditionally an end line.
/// The end line is omitted when the next item starts exactly where this
/// one ends (contiguous runs share one timestamp line) and for a trailing
/// open item. The format stores transition points, not every endpoint.
impl fmt::Display for Log {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use crate::date::DATETIME_FORMAT;
        for (index, item) in self.items.iter().enumerate() {
            if index > 0 {
                writeln!(f)?;
            }
            write!(
                f,
                "{}\n{}",
                item.start().format(DATETIME_FORMAT),
                item.description()
            )?;
            let contiguous = self
                .items
                .get(index + 1)
                .is_some_and(|next| next.start() == item.end());
            if item.ended() && !contiguous {
                write!(f, "\n{}", item.end().format(DATETIME_FORMAT))?;
            }
        }
        Ok(())
    }
}
