//! Tabload Library
//!
//! Schema-aligned loading of tabular data between a file store, a data
//! warehouse and a statistics API.
//!
//! This library provides tools for:
//! - Listing files recursively in a folder tree, optionally by extension
//! - Fetching and parsing schema descriptors stored next to the data
//! - Aligning a DataFrame with a schema and coercing integer columns
//! - Submitting typed load jobs to a warehouse and reporting the outcome
//! - Fetching time series from the statistics API as DataFrames
//!
//! Every external service sits behind a trait ([`storage::FileStore`],
//! [`warehouse::Warehouse`], [`stats::StatsTransport`]) and is passed in by
//! the caller.

pub mod align;
pub mod coerce;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod locator;
pub mod models;
pub mod schema;
pub mod stats;
pub mod storage;
pub mod warehouse;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::TabloadConfig;
pub use error::{Result, ServiceError, TabloadError};
pub use fetcher::SchemaFetcher;
pub use loader::WarehouseLoader;
pub use locator::FileLocator;
pub use models::{LoadOutcome, LoadReport, LoadTarget, RemoteFileEntry, TableRef, WriteMode};
pub use schema::{FieldMode, FieldSchema, FieldType, TableSchema};
