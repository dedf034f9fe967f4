//! In-memory warehouse that records load requests.
//!
//! Used to check exactly what the loader submits without touching a real
//! service. Submission or completion can be made to fail.

use super::{ColumnSpec, JobStatistics, LoadJob, LoadRequest, Warehouse};
use crate::error::ServiceError;
use crate::models::{TableRef, WriteMode};
use polars::prelude::DataFrame;
use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A load request as it was received
#[derive(Debug, Clone)]
pub struct RecordedLoad {
    pub job_id: String,
    pub table: TableRef,
    pub columns: Vec<ColumnSpec>,
    pub data: DataFrame,
    pub write_mode: WriteMode,
}

#[derive(Debug, Default)]
pub struct RecordingWarehouse {
    project: String,
    loads: Mutex<Vec<RecordedLoad>>,
    submit_error: Option<ServiceError>,
    job_error: Option<ServiceError>,
}

impl RecordingWarehouse {
    pub fn new(default_project: impl Into<String>) -> Self {
        Self {
            project: default_project.into(),
            ..Self::default()
        }
    }

    /// Reject every submission with `error`
    pub fn failing_submit(mut self, error: ServiceError) -> Self {
        self.submit_error = Some(error);
        self
    }

    /// Accept submissions but fail every job with `error`
    pub fn failing_jobs(mut self, error: ServiceError) -> Self {
        self.job_error = Some(error);
        self
    }

    /// Requests received so far, including ones whose job failed
    pub fn loads(&self) -> Vec<RecordedLoad> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<RecordedLoad>> {
        self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Warehouse for RecordingWarehouse {
    fn default_project(&self) -> &str {
        &self.project
    }

    fn list_datasets(&self, project: &str) -> Result<Vec<String>, ServiceError> {
        let datasets: BTreeSet<String> = self
            .lock()
            .iter()
            .filter(|load| load.table.project == project)
            .map(|load| load.table.dataset.clone())
            .collect();
        Ok(datasets.into_iter().collect())
    }

    fn list_tables(&self, project: &str, dataset: &str) -> Result<Vec<String>, ServiceError> {
        let tables: BTreeSet<String> = self
            .lock()
            .iter()
            .filter(|load| load.table.project == project && load.table.dataset == dataset)
            .map(|load| load.table.table.clone())
            .collect();
        Ok(tables.into_iter().collect())
    }

    fn submit_load(&self, request: &LoadRequest<'_>) -> Result<LoadJob, ServiceError> {
        if let Some(error) = &self.submit_error {
            return Err(error.clone());
        }

        let mut loads = self.lock();
        let job_id = format!("recorded-{}", loads.len() + 1);
        loads.push(RecordedLoad {
            job_id: job_id.clone(),
            table: request.table.clone(),
            columns: request.columns.to_vec(),
            data: request.data.clone(),
            write_mode: request.write_mode,
        });

        Ok(LoadJob {
            id: job_id,
            table: request.table.clone(),
        })
    }

    fn wait_for_job(&self, job: &LoadJob) -> Result<JobStatistics, ServiceError> {
        if let Some(error) = &self.job_error {
            return Err(error.clone());
        }

        self.lock()
            .iter()
            .find(|load| load.job_id == job.id)
            .map(|load| JobStatistics {
                rows_loaded: load.data.height(),
                total_rows: load.data.height(),
            })
            .ok_or_else(|| ServiceError::warehouse(format!("unknown job '{}'", job.id)))
    }
}
