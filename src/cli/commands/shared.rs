//! Shared utilities for CLI commands
//!
//! Logging setup, configuration loading, CSV input and terminal output
//! used by more than one subcommand.

use crate::cli::args::Args;
use crate::config::TabloadConfig;
use crate::models::{LoadOutcome, LoadReport};
use anyhow::{Context, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use polars::prelude::*;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Set up structured logging on stderr
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tabload={}", log_level)));

    if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
            .context("Failed to install log subscriber")?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
            .context("Failed to install log subscriber")?;
    }

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Layered configuration with command-line overrides applied last
pub fn load_configuration(args: &Args) -> Result<TabloadConfig> {
    let config_file = match &args.config {
        Some(path) => Some(path.clone()),
        None => TabloadConfig::default_config_path()
            .ok()
            .filter(|path| path.exists()),
    };

    let mut config = TabloadConfig::load_layered(config_file.as_deref())
        .context("Failed to load configuration")?;
    apply_cli_overrides(&mut config, args);
    Ok(config)
}

pub fn apply_cli_overrides(config: &mut TabloadConfig, args: &Args) {
    if let Some(root) = &args.storage_root {
        config.storage_root = root.clone();
    }
    if let Some(root) = &args.warehouse_root {
        config.warehouse_root = root.clone();
    }
}

/// Read a CSV file with a header row
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .with_context(|| format!("Failed to read CSV file {}", path.display()))
}

/// Spinner shown while a blocking call is pending
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Print the diagnostics of a load
pub fn print_report(report: &LoadReport) {
    println!(
        "{} {} ({})",
        "Table:".bold(),
        report.table.to_string().cyan(),
        report.write_mode
    );
    println!(
        "  {} {}",
        "Columns:".bold(),
        report.submitted_columns.join(", ")
    );

    if !report.diff.dataset_only.is_empty() {
        println!(
            "  {} {}",
            "Dropped (not in schema):".yellow(),
            join(&report.diff.dataset_only)
        );
    }
    if !report.diff.schema_only.is_empty() {
        println!(
            "  {} {}",
            "Missing from data:".yellow(),
            join(&report.diff.schema_only)
        );
    }
    if !report.coercion.converted.is_empty() {
        println!(
            "  {} {}",
            "Converted to integer:".bold(),
            report.coercion.converted.join(", ")
        );
    }
    for (column, reason) in &report.coercion.skipped {
        println!("  {} {}: {}", "Not converted:".yellow(), column, reason);
    }

    match &report.outcome {
        LoadOutcome::Success => println!("{}", "Load succeeded".green().bold()),
        LoadOutcome::Failed(e) => println!("{} {}", "Load failed:".red().bold(), e),
    }
}

fn join<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    names
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
