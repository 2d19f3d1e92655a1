//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Plain-text time tracker.
///
/// Tracks time in a human-editable journal of timestamps and task
/// descriptions, and summarizes it with a small query language.
#[derive(Debug, Parser)]
#[command(name = "lt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start a new task, ending the current one.
    Start {
        /// Task description; words are joined with spaces, use `/` to
        /// separate tags (e.g. `lt start programming / logtime`).
        #[arg(required = true)]
        description: Vec<String>,
    },

    /// End the current task.
    Stop,

    /// Show today's and this week's totals against goals.
    Status,

    /// Print a grouped duration breakdown, optionally filtered.
    Report {
        /// Query-language filter, e.g. `programming and not meetings [today;]`.
        query: Option<String>,

        /// Grouping keys applied in order: a calendar unit (year, month,
        /// day, date, year-month, week, year-week), a tag position, or a
        /// query expression. Defaults to tag positions 0 through 3.
        #[arg(short, long = "group-by")]
        group_by: Vec<String>,

        /// Output the breakdown as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print what was logged per fixed time step.
    Timeline {
        /// Query-language filter applied before slicing.
        query: Option<String>,

        /// Step size in minutes.
        #[arg(short, long, default_value_t = 15)]
        interval: i64,
    },
}
