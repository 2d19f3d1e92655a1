//! End-to-end tests for the binary: append → parse → report.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn lt_binary() -> String {
    env!("CARGO_BIN_EXE_lt").to_string()
}

fn lt(log_path: &Path, args: &[&str]) -> Output {
    Command::new(lt_binary())
        .env("LT_LOG_PATH", log_path)
        .args(args)
        .output()
        .expect("failed to run lt")
}

const LOG: &str = "2016-09-25 20:00\n\
                   chores\n\
                   2016-09-25 21:30\n\
                   work / review\n\
                   2016-09-25 21:45\n\
                   work / code\n\
                   2016-09-25 22:45\n";

#[test]
fn report_groups_a_prepared_log() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("log.txt");
    std::fs::write(&log_path, LOG).unwrap();

    let output = lt(&log_path, &["report"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "chores = 01:30\nwork = 01:15\n    code = 01:00\n    review = 00:15\n"
    );
}

#[test]
fn report_accepts_query_and_grouping_flags() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("log.txt");
    std::fs::write(&log_path, LOG).unwrap();

    let output = lt(&log_path, &["report", "work", "--group-by", "1"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "code = 01:00\nreview = 00:15\n"
    );
}

#[test]
fn report_rejects_malformed_queries() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("log.txt");
    std::fs::write(&log_path, LOG).unwrap();

    let output = lt(&log_path, &["report", "(broken"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid query"));
}

#[test]
fn start_and_stop_append_to_the_log_file() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("log.txt");

    let output = lt(&log_path, &["start", "work", "/", "code"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let text = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "work / code");

    let output = lt(&log_path, &["stop"]);
    assert!(output.status.success());

    let text = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    // The appended lines are log-format timestamps.
    for timestamp in [lines[0], lines[2]] {
        assert!(
            chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%d %H:%M").is_ok(),
            "not a timestamp line: {timestamp:?}"
        );
    }
}

#[test]
fn timeline_lists_descriptions_per_step() {
    let temp = TempDir::new().unwrap();
    let log_path = temp.path().join("log.txt");
    std::fs::write(&log_path, "2016-09-25 20:00\na\n2016-09-25 20:30\nb\n2016-09-25 21:00\n")
        .unwrap();

    let output = lt(&log_path, &["timeline", "--interval", "30"]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "2016-09-25 20:00 a\n2016-09-25 20:30 b\n"
    );
}
