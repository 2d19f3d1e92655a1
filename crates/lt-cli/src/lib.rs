//! Time tracker CLI library.
//!
//! This crate provides the command-line interface over the `lt-core`
//! log engine: starting and stopping tasks, status, reports, timeline.

mod cli;
pub mod commands;
mod config;
pub mod logfile;

pub use cli::{Cli, Commands};
pub use config::Config;
