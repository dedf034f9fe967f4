//! `series` subcommand.

use super::shared::create_spinner;
use crate::cli::args::SeriesArgs;
use crate::config::TabloadConfig;
use crate::stats::{HttpTransport, StatsClient, parse_date};
use anyhow::{Context, Result};
use colored::*;
use polars::prelude::*;
use std::fs::File;
use std::time::Duration;

pub fn run_series(args: &SeriesArgs, config: &TabloadConfig) -> Result<()> {
    let start = parse_date(&args.start).context("Invalid --start")?;
    let end = parse_date(&args.end).context("Invalid --end")?;

    let transport = HttpTransport::new(Duration::from_secs(config.statistics.timeout_secs))?;
    let client = StatsClient::new(transport, config.statistics.clone());

    let spinner = create_spinner(&format!("Fetching series {}", args.series_id));
    let result = client.fetch_series(&args.series_id, start, end);
    spinner.finish_and_clear();

    let Some(mut df) = result.with_context(|| format!("Failed to fetch series {}", args.series_id))?
    else {
        println!("{}", "The statistics API returned no data".yellow());
        return Ok(());
    };

    match &args.output {
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut df)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "{} {} observations to {}",
                "Wrote".green(),
                df.height(),
                path.display()
            );
        }
        None => println!("{}", df),
    }
    Ok(())
}
