use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use lt_cli::commands::{report, start, status, stop, timeline};
use lt_cli::{Cli, Commands, Config, logfile};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let now = Local::now().naive_local();
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match &cli.command {
        Some(Commands::Start { description }) => {
            start::run(&config.log_path, description, now)?;
            status::run(&mut out, &logfile::read(&config.log_path)?, now)?;
        }
        Some(Commands::Stop) => {
            stop::run(&config.log_path, now)?;
            status::run(&mut out, &logfile::read(&config.log_path)?, now)?;
        }
        Some(Commands::Status) | None => {
            status::run(&mut out, &logfile::read(&config.log_path)?, now)?;
        }
        Some(Commands::Report {
            query,
            group_by,
            json,
        }) => {
            report::run(
                &mut out,
                &logfile::read(&config.log_path)?,
                query.as_deref(),
                group_by,
                *json,
                now,
            )?;
        }
        Some(Commands::Timeline { query, interval }) => {
            timeline::run(
                &mut out,
                &logfile::read(&config.log_path)?,
                query.as_deref(),
                *interval,
                now,
            )?;
        }
    }

    Ok(())
}
