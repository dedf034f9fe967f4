//! `load`, `export` and `tables` subcommands.

use super::shared::{create_spinner, print_report, read_csv};
use crate::cli::args::{ExportArgs, LoadArgs, TablesArgs};
use crate::config::TabloadConfig;
use crate::fetcher::SchemaFetcher;
use crate::loader::WarehouseLoader;
use crate::locator::FileLocator;
use crate::models::{LoadOutcome, LoadReport, LoadTarget};
use crate::storage::LocalFileStore;
use crate::warehouse::{LocalWarehouse, Warehouse};
use anyhow::{Context, Result, bail};
use colored::*;
use tracing::info;

fn open_warehouse(config: &TabloadConfig) -> LocalWarehouse {
    LocalWarehouse::new(&config.warehouse_root, &config.default_project)
}

pub fn run_load(args: &LoadArgs, config: &TabloadConfig) -> Result<()> {
    let dataset = read_csv(&args.csv)?;
    info!(
        "Read {} rows x {} columns from {}",
        dataset.height(),
        dataset.width(),
        args.csv.display()
    );

    let locator = FileLocator::new(LocalFileStore::new(&config.storage_root))
        .with_config(config.traversal.clone());
    let schema = SchemaFetcher::new(locator)
        .fetch_schema(&args.schema_folder, &args.schema_file)
        .with_context(|| format!("Failed to fetch schema '{}'", args.schema_file))?;

    let mut target = LoadTarget::new(&args.dataset, &args.table);
    if let Some(project) = &args.project {
        target = target.with_project(project);
    }

    let loader = WarehouseLoader::new(open_warehouse(config));
    let spinner = create_spinner(&format!("Loading {}.{}", args.dataset, args.table));
    let report = loader.load(schema, dataset, &target, args.mode.into());
    spinner.finish_and_clear();

    finish(report.context("Load failed")?)
}

pub fn run_export(args: &ExportArgs, config: &TabloadConfig) -> Result<()> {
    let df = read_csv(&args.csv)?;

    let loader = WarehouseLoader::new(open_warehouse(config));
    let spinner = create_spinner(&format!("Exporting to {}", args.table));
    let report = loader.export_dataframe(df, &args.table, args.project.as_deref());
    spinner.finish_and_clear();

    finish(report.context("Export failed")?)
}

pub fn run_tables(args: &TablesArgs, config: &TabloadConfig) -> Result<()> {
    let warehouse = open_warehouse(config);
    let project = args
        .project
        .as_deref()
        .unwrap_or(warehouse.default_project());

    match &args.dataset {
        Some(dataset) => {
            let tables = warehouse
                .list_tables(project, dataset)
                .with_context(|| format!("Failed to list tables of {}.{}", project, dataset))?;
            println!("{} {}.{}", "Tables in".bold(), project, dataset);
            for table in tables {
                println!("  {}", table.cyan());
            }
        }
        None => {
            let datasets = warehouse
                .list_datasets(project)
                .with_context(|| format!("Failed to list datasets of {}", project))?;
            println!("{} {}", "Datasets in".bold(), project);
            for dataset in datasets {
                println!("  {}", dataset.cyan());
            }
        }
    }
    Ok(())
}

/// Print the report and turn a failed outcome into a non-zero exit
fn finish(report: LoadReport) -> Result<()> {
    print_report(&report);
    match report.outcome {
        LoadOutcome::Success => Ok(()),
        LoadOutcome::Failed(e) => bail!("Load into {} failed: {}", report.table, e),
    }
}
