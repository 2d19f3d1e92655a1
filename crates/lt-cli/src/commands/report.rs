//! Report command: grouped duration breakdowns.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use lt_core::{GroupKey, Log, NO_VALUE};

/// Tag-position levels used when no grouping keys are given.
const DEFAULT_TAG_LEVELS: usize = 4;

pub fn run<W: Write>(
    writer: &mut W,
    log_text: &str,
    query: Option<&str>,
    group_by: &[String],
    json: bool,
    now: NaiveDateTime,
) -> Result<()> {
    let mut log = Log::from_text(log_text, now).context("failed to parse log file")?;
    if let Some(query) = query {
        log = log
            .filter(query, now)
            .with_context(|| format!("invalid query {query:?}"))?;
    }

    let keys: Vec<GroupKey> = if group_by.is_empty() {
        (0..DEFAULT_TAG_LEVELS).map(GroupKey::Tag).collect()
    } else {
        group_by
            .iter()
            .map(|text| {
                GroupKey::parse(text, now)
                    .with_context(|| format!("invalid grouping key {text:?}"))
            })
            .collect::<Result<Vec<_>>>()?
    };

    let mut keys = keys.into_iter();
    // Always at least one key: the default list is non-empty.
    let first = keys.next().context("no grouping key")?;
    let mut grouped = log.group(&first);
    for key in keys {
        grouped = grouped.group(&key);
    }

    if json {
        let rendered = serde_json::to_string_pretty(&grouped.sum())
            .context("failed to serialize report")?;
        writeln!(writer, "{rendered}")?;
    } else {
        writeln!(writer, "{}", grouped.render(Some(NO_VALUE)))?;
    }
    Ok(())
}
