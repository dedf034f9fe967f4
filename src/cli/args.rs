//! Command-line argument definitions for tabload
//!
//! Global flags (configuration file, roots, verbosity) apply to every
//! subcommand and override the layered configuration.

use crate::models::WriteMode;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Move tabular data between file storage, a warehouse and a statistics API
#[derive(Debug, Clone, Parser)]
#[command(
    name = "tabload",
    version,
    about = "Schema-aligned loading of tabular data into a warehouse",
    long_about = "Locates files and schema descriptors in a file store, aligns CSV datasets \
                  with their declared schema, coerces integer columns and loads the result \
                  into warehouse tables. Also fetches time series from the statistics API."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// JSON configuration file
    ///
    /// Defaults to <config_dir>/tabload/config.json when that file exists.
    #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Root directory of the file store
    #[arg(long = "storage-root", value_name = "PATH", global = true)]
    pub storage_root: Option<PathBuf>,

    /// Root directory of the warehouse
    #[arg(long = "warehouse-root", value_name = "PATH", global = true)]
    pub warehouse_root: Option<PathBuf>,

    /// Increase logging verbosity
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        global = true,
        help = "Enable verbose logging (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only log errors
    #[arg(short = 'q', long = "quiet", global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// List files below a storage folder
    Ls(LsArgs),
    /// Fetch and show a schema descriptor
    Schema(SchemaArgs),
    /// Load a CSV file into a table using a stored schema
    Load(LoadArgs),
    /// Replace a table with a CSV file, inferring the schema
    Export(ExportArgs),
    /// List datasets, or the tables of one dataset
    Tables(TablesArgs),
    /// Fetch a time series from the statistics API
    Series(SeriesArgs),
}

#[derive(Debug, Clone, Parser)]
pub struct LsArgs {
    /// Folder id relative to the storage root ("" for the root)
    #[arg(value_name = "FOLDER", default_value = "")]
    pub folder: String,

    /// Only list files with this extension
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    pub extension: Option<String>,

    /// Parent name reported for top-level entries
    #[arg(long = "parent-name", value_name = "NAME")]
    pub parent_name: Option<String>,
}

#[derive(Debug, Clone, Parser)]
pub struct SchemaArgs {
    /// Folder searched for the schema file
    #[arg(value_name = "FOLDER")]
    pub folder: String,

    /// Schema file name, e.g. orders_schema.txt
    #[arg(value_name = "FILE")]
    pub file: String,
}

#[derive(Debug, Clone, Parser)]
pub struct LoadArgs {
    /// CSV file with a header row
    #[arg(long = "csv", value_name = "PATH")]
    pub csv: PathBuf,

    /// Folder holding the schema file
    #[arg(long = "schema-folder", value_name = "FOLDER")]
    pub schema_folder: String,

    /// Schema file name
    #[arg(long = "schema-file", value_name = "FILE")]
    pub schema_file: String,

    #[arg(short = 'd', long = "dataset")]
    pub dataset: String,

    #[arg(short = 't', long = "table")]
    pub table: String,

    /// Project; defaults to the configured project
    #[arg(short = 'p', long = "project")]
    pub project: Option<String>,

    #[arg(short = 'm', long = "mode", value_enum, default_value_t = WriteModeArg::Append)]
    pub mode: WriteModeArg,
}

#[derive(Debug, Clone, Parser)]
pub struct ExportArgs {
    /// CSV file with a header row
    #[arg(long = "csv", value_name = "PATH")]
    pub csv: PathBuf,

    /// Target table as dataset.table
    #[arg(short = 't', long = "table", value_name = "DATASET.TABLE")]
    pub table: String,

    #[arg(short = 'p', long = "project")]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Parser)]
pub struct TablesArgs {
    /// List the tables of this dataset instead of the datasets
    #[arg(short = 'd', long = "dataset")]
    pub dataset: Option<String>,

    #[arg(short = 'p', long = "project")]
    pub project: Option<String>,
}

#[derive(Debug, Clone, Parser)]
pub struct SeriesArgs {
    /// Series identifier, e.g. SF43718
    #[arg(value_name = "ID")]
    pub series_id: String,

    /// First date, DD/MM/YYYY
    #[arg(long = "start", value_name = "DATE")]
    pub start: String,

    /// Last date, DD/MM/YYYY
    #[arg(long = "end", value_name = "DATE")]
    pub end: String,

    /// Write the observations to this CSV file instead of printing them
    #[arg(short = 'o', long = "output", value_name = "CSV")]
    pub output: Option<PathBuf>,
}

/// Write mode as accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WriteModeArg {
    Append,
    Truncate,
    Empty,
}

impl From<WriteModeArg> for WriteMode {
    fn from(arg: WriteModeArg) -> Self {
        match arg {
            WriteModeArg::Append => WriteMode::Append,
            WriteModeArg::Truncate => WriteMode::Truncate,
            WriteModeArg::Empty => WriteMode::Empty,
        }
    }
}

impl Args {
    /// Tracing level derived from `--verbose` and `--quiet`
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }
}
