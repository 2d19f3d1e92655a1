//! Multi-level grouping and duration aggregation.
//!
//! [`Log::group`] partitions a log by a [`GroupKey`] into a [`GroupedLog`],
//! a recursive key-to-log mapping. Grouping composes: grouping a
//! [`GroupedLog`] recurses into every sub-log, adding one nesting level.
//! Summing mirrors the nesting into a [`GroupedTime`] with duration leaves.

use std::fmt;
use std::ops::Index;

use chrono::{Duration, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::item::LogItem;
use crate::log::Log;
use crate::query::{self, Query, QueryError};

/// Sentinel key for items that have no value for the grouping key, e.g. a
/// tag path shorter than the requested position.
pub const NO_VALUE: &str = "_";

/// A grouping key: how to derive a group name from an item.
pub enum GroupKey {
    /// Calendar unit of the item's start (`%Y`).
    Year,
    /// `%m`
    Month,
    /// `%d`
    Day,
    /// `%Y-%m-%d`
    Date,
    /// `%Y-%m`
    YearMonth,
    /// ISO-agnostic week number (`%W`).
    Week,
    /// `%Y-%W`
    YearWeek,
    /// The tag at this position, or [`NO_VALUE`] for shorter tag paths.
    Tag(usize),
    /// Partition into items matching a query (keyed by its text) and the
    /// rest (keyed by [`NO_VALUE`]).
    Matches { label: String, query: Query },
    /// An arbitrary key function.
    Custom(Box<dyn Fn(&LogItem) -> String>),
}

impl GroupKey {
    /// Parses a key shorthand: a calendar unit name, a tag position
    /// index, or a query-language expression.
    pub fn parse(text: &str, now: NaiveDateTime) -> Result<Self, QueryError> {
        match text {
            "year" => Ok(Self::Year),
            "month" => Ok(Self::Month),
            "day" => Ok(Self::Day),
            "date" => Ok(Self::Date),
            "year-month" => Ok(Self::YearMonth),
            "week" => Ok(Self::Week),
            "year-week" => Ok(Self::YearWeek),
            _ => {
                if let Ok(index) = text.parse::<usize>() {
                    return Ok(Self::Tag(index));
                }
                Ok(Self::Matches {
                    label: text.to_string(),
                    query: query::parse(text, now)?,
                })
            }
        }
    }

    /// The group name for an item.
    #[must_use]
    pub fn key_for(&self, item: &LogItem) -> String {
        match self {
            Self::Year => item.start().format("%Y").to_string(),
            Self::Month => item.start().format("%m").to_string(),
            Self::Day => item.start().format("%d").to_string(),
            Self::Date => item.start().format("%F").to_string(),
            Self::YearMonth => item.start().format("%Y-%m").to_string(),
            Self::Week => item.start().format("%W").to_string(),
            Self::YearWeek => item.start().format("%Y-%W").to_string(),
            Self::Tag(index) => item.tag(*index).unwrap_or(NO_VALUE).to_string(),
            Self::Matches { label, query } => {
                if query.matches(item) {
                    label.clone()
                } else {
                    NO_VALUE.to_string()
                }
            }
            Self::Custom(f) => f(item),
        }
    }
}

impl fmt::Debug for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Year => write!(f, "Year"),
            Self::Month => write!(f, "Month"),
            Self::Day => write!(f, "Day"),
            Self::Date => write!(f, "Date"),
            Self::YearMonth => write!(f, "YearMonth"),
            Self::Week => write!(f, "Week"),
            Self::YearWeek => write!(f, "YearWeek"),
            Self::Tag(index) => write!(f, "Tag({index})"),
            Self::Matches { label, .. } => write!(f, "Matches({label:?})"),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

impl Log {
    /// Partitions the log's items by `key`.
    ///
    /// Every group is a leaf; call [`GroupedLog::group`] on the result to
    /// nest further levels. Group names keep the order in which they first
    /// occur in the log.
    #[must_use]
    pub fn group(&self, key: &GroupKey) -> GroupedLog {
        let mut groups: Groups<Vec<LogItem>> = Groups::new();
        for item in self {
            groups.entry(key.key_for(item)).push(item.clone());
        }
        GroupedLog::Node(
            groups
                .into_iter()
                .map(|(name, items)| (name, GroupedLog::Leaf(Self::from_items(items))))
                .collect(),
        )
    }
}

/// An ordered mapping from group name to `V`. A name's position is fixed
/// by its first insertion; rendering and serialization iterate by sorted
/// name instead, and equality ignores order entirely.
#[derive(Debug, Clone)]
pub struct Groups<V>(Vec<(String, V)>);

impl<V> Groups<V> {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&V> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Replaces the value of an existing name in place, or appends a new
    /// name at the end.
    pub fn insert(&mut self, key: String, value: V) {
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.0.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &V)> {
        self.0.iter().map(|(k, v)| (k, v))
    }

    /// Name-sorted iteration, for display output.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&String, &V)> {
        let mut pairs: Vec<_> = self.0.iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs.into_iter().map(|(k, v)| (k, v))
    }

    fn entry(&mut self, key: String) -> &mut V
    where
        V: Default,
    {
        let index = match self.0.iter().position(|(k, _)| *k == key) {
            Some(index) => index,
            None => {
                self.0.push((key, V::default()));
                self.0.len() - 1
            }
        };
        &mut self.0[index].1
    }
}

impl<V> Default for Groups<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: PartialEq> PartialEq for Groups<V> {
    fn eq(&self, other: &Self) -> bool {
        self.0.len() == other.0.len() && self.0.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<V: Eq> Eq for Groups<V> {}

impl<V> FromIterator<(String, V)> for Groups<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        let mut groups = Self::new();
        for (key, value) in iter {
            groups.insert(key, value);
        }
        groups
    }
}

impl<V> IntoIterator for Groups<V> {
    type Item = (String, V);
    type IntoIter = std::vec::IntoIter<(String, V)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<V> Index<&str> for Groups<V> {
    type Output = V;

    fn index(&self, key: &str) -> &V {
        self.get(key)
            .unwrap_or_else(|| panic!("no group named {key:?}"))
    }
}

/// A recursive mapping from group key to log or nested grouping.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupedLog {
    Leaf(Log),
    Node(Groups<GroupedLog>),
}

impl GroupedLog {
    /// Applies `f` to every item in every leaf.
    #[must_use]
    pub fn map(&self, f: &impl Fn(&LogItem) -> LogItem) -> Self {
        match self {
            Self::Leaf(log) => Self::Leaf(log.map(f)),
            Self::Node(groups) => Self::Node(
                groups
                    .iter()
                    .map(|(name, sub)| (name.clone(), sub.map(f)))
                    .collect(),
            ),
        }
    }

    /// Filters every leaf by `predicate`.
    #[must_use]
    pub fn filter_items(&self, predicate: &impl Fn(&LogItem) -> bool) -> Self {
        match self {
            Self::Leaf(log) => Self::Leaf(log.filter_items(predicate)),
            Self::Node(groups) => Self::Node(
                groups
                    .iter()
                    .map(|(name, sub)| (name.clone(), sub.filter_items(predicate)))
                    .collect(),
            ),
        }
    }

    /// Filters every leaf by an already-parsed query.
    #[must_use]
    pub fn filter_query(&self, query: &Query) -> Self {
        match self {
            Self::Leaf(log) => Self::Leaf(log.filter_query(query)),
            Self::Node(groups) => Self::Node(
                groups
                    .iter()
                    .map(|(name, sub)| (name.clone(), sub.filter_query(query)))
                    .collect(),
            ),
        }
    }

    /// Recurses one more grouping level into every leaf.
    #[must_use]
    pub fn group(&self, key: &GroupKey) -> Self {
        match self {
            Self::Leaf(log) => log.group(key),
            Self::Node(groups) => Self::Node(
                groups
                    .iter()
                    .map(|(name, sub)| (name.clone(), sub.group(key)))
                    .collect(),
            ),
        }
    }

    /// Sums every leaf, mirroring the nesting structure.
    #[must_use]
    pub fn sum(&self) -> GroupedTime {
        match self {
            Self::Leaf(log) => GroupedTime::Leaf(log.sum()),
            Self::Node(groups) => GroupedTime::Node(
                groups
                    .iter()
                    .map(|(name, sub)| (name.clone(), sub.sum()))
                    .collect(),
            ),
        }
    }

    /// Total duration across all leaves.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.sum().sum()
    }

    /// Renders the grouping as an indented breakdown, keys sorted, each
    /// with its total duration.
    ///
    /// A nested level whose only key is `skip` is not descended into, so a
    /// trailing all-sentinel level stays silent.
    #[must_use]
    pub fn render(&self, skip: Option<&str>) -> String {
        match self {
            Self::Leaf(log) => format_duration(log.sum()),
            Self::Node(_) => {
                let mut out = String::new();
                self.render_into(&mut out, 0, skip);
                out
            }
        }
    }

    fn render_into(&self, out: &mut String, indent: usize, skip: Option<&str>) {
        let Self::Node(groups) = self else {
            return;
        };
        let mut first = true;
        for (name, sub) in groups.iter_sorted() {
            if !first {
                out.push('\n');
            }
            first = false;
            out.push_str(&"    ".repeat(indent));
            out.push_str(name);
            out.push_str(" = ");
            out.push_str(&format_duration(sub.total()));
            let only_skip = match sub {
                Self::Node(sub_groups) => {
                    sub_groups.len() == 1 && skip.is_some_and(|s| sub_groups.contains_key(s))
                }
                Self::Leaf(_) => true,
            };
            if !only_skip {
                out.push('\n');
                sub.render_into(out, indent + 1, skip);
            }
        }
    }
}

impl fmt::Display for GroupedLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(None))
    }
}

/// The duration analogue of [`GroupedLog`]: the same nested key structure
/// with total durations at the leaves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupedTime {
    Leaf(Duration),
    Node(Groups<GroupedTime>),
}

impl GroupedTime {
    /// Recursive total over all leaves.
    #[must_use]
    pub fn sum(&self) -> Duration {
        match self {
            Self::Leaf(duration) => *duration,
            Self::Node(groups) => groups
                .values()
                .fold(Duration::zero(), |acc, sub| acc + sub.sum()),
        }
    }

    /// Looks up a sub-grouping by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Leaf(_) => None,
            Self::Node(groups) => groups.get(key),
        }
    }
}

impl fmt::Display for GroupedTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn write_node(
            f: &mut fmt::Formatter<'_>,
            node: &GroupedTime,
            indent: usize,
            first: &mut bool,
        ) -> fmt::Result {
            let GroupedTime::Node(groups) = node else {
                return Ok(());
            };
            for (name, sub) in groups.iter_sorted() {
                if !*first {
                    writeln!(f)?;
                }
                *first = false;
                write!(
                    f,
                    "{}{name} = {}",
                    "    ".repeat(indent),
                    format_duration(sub.sum())
                )?;
                write_node(f, sub, indent + 1, first)?;
            }
            Ok(())
        }

        match self {
            Self::Leaf(duration) => f.write_str(&format_duration(*duration)),
            Self::Node(_) => write_node(f, self, 0, &mut true),
        }
    }
}

/// Serializes as nested maps with `HH:MM` strings at the leaves, for the
/// report JSON output.
impl Serialize for GroupedTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Leaf(duration) => serializer.serialize_str(&format_duration(*duration)),
            Self::Node(groups) => {
                let mut map = serializer.serialize_map(Some(groups.len()))?;
                for (name, sub) in groups.iter_sorted() {
                    map.serialize_entry(name, sub)?;
                }
                map.end()
            }
        }
    }
}

/// Formats a duration as `HH:MM`, with a leading `-` when negative.
#[must_use]
pub fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes();
    let (sign, minutes) = if minutes < 0 { ("-", -minutes) } else { ("", minutes) };
    format!("{sign}{:02}:{:02}", minutes / 60, minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date::DATETIME_FORMAT;

    const NOW: &str = "2016-09-25 15:10";

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).unwrap()
    }

    fn now() -> NaiveDateTime {
        dt(NOW)
    }

    fn sample() -> Log {
        Log::from_text(
            "2016-09-25 14:50\n\
             tag1 - tag2\n\
             2016-09-25 14:55\n\
             tag1 - tag3\n\
             2016-09-25 14:58",
            now(),
        )
        .unwrap()
    }

    #[test]
    fn grouping_by_tag_positions_splits_durations() {
        let grouped = sample().group(&GroupKey::Tag(0)).group(&GroupKey::Tag(1));
        let times = grouped.sum();
        assert_eq!(times.sum(), Duration::minutes(8));
        assert_eq!(
            times.get("tag1 - tag2").unwrap().sum(),
            Duration::minutes(5)
        );
        assert_eq!(
            times.get("tag1 - tag3").unwrap().sum(),
            Duration::minutes(3)
        );
        // Single-element tag paths fall into the sentinel at position 1.
        assert_eq!(
            times.get("tag1 - tag2").unwrap().get(NO_VALUE).unwrap().sum(),
            Duration::minutes(5)
        );
    }

    #[test]
    fn grouping_conserves_total_duration() {
        let log = Log::from_text(
            "2016-09-30 23:00\na / b\n2016-10-01 01:00\nc\n2016-10-02 02:30",
            now(),
        )
        .unwrap();
        let total = log.sum();
        for key in [
            GroupKey::Year,
            GroupKey::Month,
            GroupKey::Day,
            GroupKey::Date,
            GroupKey::YearMonth,
            GroupKey::Week,
            GroupKey::YearWeek,
            GroupKey::Tag(0),
            GroupKey::Tag(5),
            GroupKey::parse("a and b", now()).unwrap(),
            GroupKey::Custom(Box::new(|i| i.description())),
        ] {
            assert_eq!(log.group(&key).sum().sum(), total, "key {key:?}");
        }
    }

    #[test]
    fn calendar_keys_derive_from_item_start() {
        let log = Log::from_text("2016-09-30 23:00\na\n2016-10-01 01:00", now()).unwrap();
        let GroupedLog::Node(groups) = log.group(&GroupKey::Date) else {
            panic!("expected a node");
        };
        assert_eq!(groups.keys().collect::<Vec<_>>(), ["2016-09-30"]);
        let GroupedLog::Node(groups) = log.group(&GroupKey::YearMonth) else {
            panic!("expected a node");
        };
        assert_eq!(groups.keys().collect::<Vec<_>>(), ["2016-09"]);
    }

    #[test]
    fn grouping_keeps_first_occurrence_order() {
        let log = Log::from_text(
            "2016-09-25 20:00\nz\n2016-09-25 20:30\na\n2016-09-25 21:00\nz\n2016-09-25 21:30",
            now(),
        )
        .unwrap();
        let grouped = log.group(&GroupKey::Tag(0));
        let GroupedLog::Node(groups) = &grouped else {
            panic!("expected a node");
        };
        // `z` keeps the position of its first occurrence; both visits land
        // in the same group.
        assert_eq!(groups.keys().collect::<Vec<_>>(), ["z", "a"]);
        assert_eq!(grouped.sum().get("z").unwrap().sum(), Duration::minutes(60));
        // Rendering still goes by sorted name.
        assert_eq!(grouped.render(None), "a = 00:30\nz = 01:00");
    }

    #[test]
    fn query_key_partitions_into_match_and_sentinel() {
        let key = GroupKey::parse("tag1 - tag2", now()).unwrap();
        let times = sample().group(&key).sum();
        assert_eq!(times.get("tag1 - tag2").unwrap().sum(), Duration::minutes(5));
        assert_eq!(times.get(NO_VALUE).unwrap().sum(), Duration::minutes(3));
    }

    #[test]
    fn group_key_parse_rejects_malformed_queries() {
        assert!(GroupKey::parse("and and", now()).is_err());
    }

    #[test]
    fn nested_grouping_recurses_into_leaves() {
        let log = Log::from_text(
            "2016-09-30 23:00\nwork / a\n2016-10-01 01:00\nwork / b\n2016-10-01 02:00",
            now(),
        )
        .unwrap();
        let grouped = log.group(&GroupKey::Tag(0)).group(&GroupKey::Tag(1));
        let GroupedLog::Node(top) = &grouped else {
            panic!("expected a node");
        };
        let GroupedLog::Node(inner) = &top["work"] else {
            panic!("expected a nested node");
        };
        assert_eq!(inner.keys().collect::<Vec<_>>(), ["a", "b"]);
    }

    #[test]
    fn render_indents_nested_levels_and_sorts_keys() {
        let log = Log::from_text(
            "2016-09-25 20:00\nb / y\n2016-09-25 21:00\na / x\n2016-09-25 21:30",
            now(),
        )
        .unwrap();
        let grouped = log.group(&GroupKey::Tag(0)).group(&GroupKey::Tag(1));
        assert_eq!(
            grouped.render(None),
            "a = 00:30\n    x = 00:30\nb = 01:00\n    y = 01:00"
        );
    }

    #[test]
    fn render_skips_an_all_sentinel_level() {
        let grouped = sample().group(&GroupKey::Tag(0)).group(&GroupKey::Tag(1));
        assert_eq!(
            grouped.render(Some(NO_VALUE)),
            "tag1 - tag2 = 00:05\ntag1 - tag3 = 00:03"
        );
    }

    #[test]
    fn filter_and_map_reach_every_leaf() {
        let grouped = sample().group(&GroupKey::Tag(0));
        let emptied = grouped.filter_items(&|_| false);
        assert_eq!(emptied.total(), Duration::zero());
        let relabeled = grouped.map(&|i| i.with_tags(["x"]));
        assert_eq!(relabeled.total(), Duration::minutes(8));
    }

    #[test]
    fn grouped_time_renders_and_serializes() {
        let times = sample().group(&GroupKey::Tag(0)).sum();
        assert_eq!(
            times.to_string(),
            "tag1 - tag2 = 00:05\ntag1 - tag3 = 00:03"
        );
        assert_eq!(
            serde_json::to_string(&times).unwrap(),
            r#"{"tag1 - tag2":"00:05","tag1 - tag3":"00:03"}"#
        );
    }

    #[test]
    fn format_duration_handles_sign_and_hours() {
        assert_eq!(format_duration(Duration::minutes(8)), "00:08");
        assert_eq!(format_duration(Duration::minutes(75)), "01:15");
        assert_eq!(format_duration(Duration::minutes(-30)), "-00:30");
        assert_eq!(format_duration(Duration::zero()), "00:00");
    }
}
