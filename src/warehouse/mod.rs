//! Warehouse collaborators.
//!
//! A warehouse accepts load jobs: a DataFrame, the column schema it must be
//! stored with, a target table and a write disposition. Jobs are submitted
//! and then awaited; a job either completes fully or fails.

pub mod local;
pub mod recording;

pub use local::LocalWarehouse;
pub use recording::RecordingWarehouse;

use crate::error::ServiceError;
use crate::models::{TableRef, WriteMode};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Warehouse-native column description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    pub mode: String,
    pub description: String,
}

/// Everything a warehouse needs to run one load job
#[derive(Debug, Clone, Copy)]
pub struct LoadRequest<'a> {
    pub table: &'a TableRef,
    pub columns: &'a [ColumnSpec],
    pub data: &'a DataFrame,
    pub write_mode: WriteMode,
}

/// Handle for a submitted load job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadJob {
    pub id: String,
    pub table: TableRef,
}

/// Figures reported by a completed job
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobStatistics {
    pub rows_loaded: usize,
    /// Table size after the job
    pub total_rows: usize,
}

pub trait Warehouse {
    /// Project used when the caller does not name one
    fn default_project(&self) -> &str;

    fn list_datasets(&self, project: &str) -> Result<Vec<String>, ServiceError>;

    fn list_tables(&self, project: &str, dataset: &str) -> Result<Vec<String>, ServiceError>;

    fn submit_load(&self, request: &LoadRequest<'_>) -> Result<LoadJob, ServiceError>;

    /// Block until `job` finishes
    fn wait_for_job(&self, job: &LoadJob) -> Result<JobStatistics, ServiceError>;
}

impl<W: Warehouse + ?Sized> Warehouse for &W {
    fn default_project(&self) -> &str {
        (**self).default_project()
    }

    fn list_datasets(&self, project: &str) -> Result<Vec<String>, ServiceError> {
        (**self).list_datasets(project)
    }

    fn list_tables(&self, project: &str, dataset: &str) -> Result<Vec<String>, ServiceError> {
        (**self).list_tables(project, dataset)
    }

    fn submit_load(&self, request: &LoadRequest<'_>) -> Result<LoadJob, ServiceError> {
        (**self).submit_load(request)
    }

    fn wait_for_job(&self, job: &LoadJob) -> Result<JobStatistics, ServiceError> {
        (**self).wait_for_job(job)
    }
}
