//! Timeline command: what was logged per fixed time step.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use lt_core::{Log, SliceStep};

pub fn run<W: Write>(
    writer: &mut W,
    log_text: &str,
    query: Option<&str>,
    interval_minutes: i64,
    now: NaiveDateTime,
) -> Result<()> {
    anyhow::ensure!(interval_minutes > 0, "interval must be positive");
    let mut log = Log::from_text(log_text, now).context("failed to parse log file")?;
    if let Some(query) = query {
        log = log
            .filter(query, now)
            .with_context(|| format!("invalid query {query:?}"))?;
    }

    let step = SliceStep::Fixed(Duration::minutes(interval_minutes));
    for slice in log.slice_periods(None, None, step) {
        let descriptions: Vec<String> = slice
            .log
            .iter()
            .filter(|i| i.duration() > Duration::zero())
            .map(lt_core::LogItem::description)
            .collect();
        writeln!(
            writer,
            "{} {}",
            slice.start.format("%F %R"),
            descriptions.join(", ")
        )?;
    }
    Ok(())
}
