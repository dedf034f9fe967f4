//! `ls` and `schema` subcommands.

use crate::cli::args::{LsArgs, SchemaArgs};
use crate::config::TabloadConfig;
use crate::fetcher::SchemaFetcher;
use crate::locator::FileLocator;
use crate::storage::LocalFileStore;
use anyhow::{Context, Result};
use colored::*;

fn locator(config: &TabloadConfig) -> FileLocator<LocalFileStore> {
    FileLocator::new(LocalFileStore::new(&config.storage_root))
        .with_config(config.traversal.clone())
}

pub fn run_ls(args: &LsArgs, config: &TabloadConfig) -> Result<()> {
    let entries = locator(config)
        .list_files(
            &args.folder,
            args.extension.as_deref(),
            args.parent_name.as_deref(),
        )
        .with_context(|| format!("Failed to list folder '{}'", args.folder))?;

    if entries.is_empty() {
        println!("{}", "No matching files".yellow());
        return Ok(());
    }

    for entry in &entries {
        println!(
            "{:<40} {:<50} {}",
            entry.name.bold(),
            entry.id,
            entry.parent_name.as_deref().unwrap_or("-").dimmed()
        );
    }
    println!("{} {}", entries.len().to_string().green(), "entries".green());
    Ok(())
}

pub fn run_schema(args: &SchemaArgs, config: &TabloadConfig) -> Result<()> {
    let schema = SchemaFetcher::new(locator(config))
        .fetch_schema(&args.folder, &args.file)
        .with_context(|| format!("Failed to fetch schema '{}'", args.file))?;

    println!("{} {} fields", args.file.bold(), schema.len());
    for field in schema.fields() {
        println!(
            "  {:<30} {:<10} {:<9} {}",
            field.name.cyan(),
            field.field_type.as_str(),
            field.mode.as_str(),
            field.description.dimmed()
        );
    }
    Ok(())
}
