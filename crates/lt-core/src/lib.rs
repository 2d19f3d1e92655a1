//! Core log representation and query engine for the `lt` time tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Parsing the plain-text journal into time intervals
//! - The `Log` collection: filter, map, slice, group, sum, serialize
//! - The boolean/slice query language (lexer, parser, evaluator)
//! - Recursive grouping and duration aggregation
//!
//! Nothing here reads the wall clock: every operation that needs "now"
//! takes it as an explicit parameter.

pub mod date;
pub mod group;
pub mod item;
pub mod log;
pub mod parse;
pub mod query;

pub use date::{DATE_FORMAT, DATETIME_FORMAT, DateError};
pub use group::{GroupKey, GroupedLog, GroupedTime, Groups, NO_VALUE, format_duration};
pub use item::{LogItem, ValidationError};
pub use log::{Log, LogSlice, SliceStep};
pub use parse::{Variables, VariablesError, parse_log};
pub use query::{Query, QueryError};
