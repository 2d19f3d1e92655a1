//! Status command: today's and this week's totals against goals.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use lt_core::{GroupKey, Log, NO_VALUE, Variables, VariablesError, format_duration};

/// Width of the goal progress bar.
const BAR_WIDTH: usize = 20;

pub fn run<W: Write>(writer: &mut W, log_text: &str, now: NaiveDateTime) -> Result<()> {
    let log = Log::from_text(log_text, now).context("failed to parse log file")?;
    let variables = Variables::parse(log_text);

    let week_key = now.format("%Y-%W").to_string();
    let date_key = now.format("%F").to_string();
    let this_week =
        log.filter_items(|i| i.start().format("%Y-%W").to_string() == week_key);
    let today = this_week.filter_items(|i| i.start().date() == now.date());

    let week_goal = goal(&variables, &[&format!("week {week_key}"), "week"])?;
    let day_goal = goal(&variables, &[&date_key, "day"])?;

    write_line(writer, "WEEK", this_week.sum(), week_goal)?;
    write_line(writer, " DAY", today.sum(), day_goal)?;

    if !this_week.is_empty() {
        writeln!(writer)?;
        let by_description = this_week.group(&GroupKey::Custom(Box::new(|i| i.description())));
        writeln!(writer, "{}", by_description.render(Some(NO_VALUE)))?;
    }
    Ok(())
}

/// Resolves a goal duration; an unconfigured goal is simply absent, but a
/// malformed one is an error.
fn goal(variables: &Variables, keys: &[&str]) -> Result<Option<chrono::Duration>> {
    match variables.hours(keys) {
        Ok(duration) => Ok(Some(duration)),
        Err(VariablesError::NoMatchingKey { .. }) => Ok(None),
        Err(err @ VariablesError::InvalidHours { .. }) => Err(err.into()),
    }
}

fn write_line<W: Write>(
    writer: &mut W,
    title: &str,
    done: chrono::Duration,
    goal: Option<chrono::Duration>,
) -> Result<()> {
    match goal {
        Some(goal) => {
            let ratio = ratio(done, goal);
            writeln!(
                writer,
                "{title} {}/{} {}",
                format_duration(done),
                format_duration(goal),
                progress_bar(ratio, BAR_WIDTH)
            )?;
        }
        None => writeln!(writer, "{title} {}", format_duration(done))?,
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn ratio(done: chrono::Duration, goal: chrono::Duration) -> f64 {
    if goal.num_seconds() == 0 {
        return 1.0;
    }
    done.num_seconds() as f64 / goal.num_seconds() as f64
}

/// A filled/empty block bar; completion renders as a full bar.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn progress_bar(ratio: f64, width: usize) -> String {
    if ratio >= 1.0 {
        return "█".repeat(width);
    }
    let filled = ((ratio.max(0.0)) * width as f64).floor() as usize;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
