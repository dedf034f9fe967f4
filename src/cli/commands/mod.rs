//! Command implementations for the tabload CLI
//!
//! Each subcommand lives in its own module; [`run`] sets up logging and
//! configuration and dispatches.

pub mod files;
pub mod series;
pub mod shared;
pub mod warehouse;

use crate::cli::args::{Args, Commands};
use anyhow::Result;

/// Main command runner
pub fn run(args: Args) -> Result<()> {
    shared::setup_logging(&args)?;
    let config = shared::load_configuration(&args)?;

    match &args.command {
        Commands::Ls(ls_args) => files::run_ls(ls_args, &config),
        Commands::Schema(schema_args) => files::run_schema(schema_args, &config),
        Commands::Load(load_args) => warehouse::run_load(load_args, &config),
        Commands::Export(export_args) => warehouse::run_export(export_args, &config),
        Commands::Tables(tables_args) => warehouse::run_tables(tables_args, &config),
        Commands::Series(series_args) => series::run_series(series_args, &config),
    }
}
