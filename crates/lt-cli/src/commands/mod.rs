//! CLI subcommand implementations.

pub mod report;
pub mod start;
pub mod status;
pub mod stop;
pub mod timeline;
