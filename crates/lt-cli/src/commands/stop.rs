//! Stop command: end the current task.

use std::path::Path;

use anyhow::Result;
use chrono::NaiveDateTime;
use lt_core::DATETIME_FORMAT;

use crate::logfile;

/// Appends a bare timestamp line, closing the task in progress.
pub fn run(log_path: &Path, now: NaiveDateTime) -> Result<()> {
    logfile::append(log_path, &now.format(DATETIME_FORMAT).to_string())?;
    tracing::debug!("task ended");
    Ok(())
}
