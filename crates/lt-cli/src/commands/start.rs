//! Start command: begin a new task.

use std::path::Path;

use anyhow::Result;
use chrono::NaiveDateTime;
use lt_core::DATETIME_FORMAT;

use crate::logfile;

/// Appends a timestamp line and a tag line to the log file.
///
/// The new timestamp doubles as the end of the task currently running, so
/// starting a task always ends the previous one.
pub fn run(log_path: &Path, words: &[String], now: NaiveDateTime) -> Result<()> {
    let description = words.join(" ");
    let entry = format!("{}\n{}", now.format(DATETIME_FORMAT), description);
    logfile::append(log_path, &entry)?;
    tracing::debug!(%description, "task started");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).unwrap()
    }

    #[test]
    fn start_appends_timestamp_and_description() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("log.txt");
        let words = vec!["programming".to_string(), "/".to_string(), "logtime".to_string()];
        run(&path, &words, dt("2016-09-25 14:50")).unwrap();
        assert_eq!(
            logfile::read(&path).unwrap(),
            "2016-09-25 14:50\nprogramming / logtime\n"
        );
    }

    #[test]
    fn starting_over_an_open_task_ends_it() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("log.txt");
        run(&path, &["a".to_string()], dt("2016-09-25 14:50")).unwrap();
        run(&path, &["b".to_string()], dt("2016-09-25 14:55")).unwrap();

        let now = dt("2016-09-25 15:00");
        let log = lt_core::Log::from_text(&logfile::read(&path).unwrap(), now).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.items()[0].ended());
        assert!(!log.items()[1].ended());
    }
}
