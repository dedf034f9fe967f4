//! Parquet-backed warehouse on the local filesystem.
//!
//! Layout:
//! ```text
//! root/
//!   project/
//!     dataset/
//!       table.parquet
//!       table.schema.json
//! ```
//!
//! Jobs run synchronously at submission; their outcome is kept until it is
//! collected with [`Warehouse::wait_for_job`].

use super::{ColumnSpec, JobStatistics, LoadJob, LoadRequest, Warehouse};
use crate::error::ServiceError;
use crate::models::{TableRef, WriteMode};
use crate::schema::{FieldMode, FieldType};
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::{debug, info};
use walkdir::WalkDir;

const DATA_SUFFIX: &str = "parquet";
const SCHEMA_SUFFIX: &str = "schema.json";

#[derive(Debug, Clone)]
enum JobState {
    Done(JobStatistics),
    Failed(ServiceError),
}

#[derive(Debug)]
pub struct LocalWarehouse {
    root: PathBuf,
    project: String,
    jobs: Mutex<HashMap<String, JobState>>,
    next_job: AtomicU64,
}

impl LocalWarehouse {
    pub fn new(root: impl Into<PathBuf>, default_project: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            project: default_project.into(),
            jobs: Mutex::new(HashMap::new()),
            next_job: AtomicU64::new(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn table_dir(&self, table: &TableRef) -> PathBuf {
        self.root.join(&table.project).join(&table.dataset)
    }

    fn data_path(&self, table: &TableRef) -> PathBuf {
        self.table_dir(table)
            .join(format!("{}.{}", table.table, DATA_SUFFIX))
    }

    fn schema_path(&self, table: &TableRef) -> PathBuf {
        self.table_dir(table)
            .join(format!("{}.{}", table.table, SCHEMA_SUFFIX))
    }

    /// Current contents of `table`
    pub fn read_table(&self, table: &TableRef) -> Result<DataFrame, ServiceError> {
        let path = self.data_path(table);
        let file = File::open(&path)
            .map_err(|e| ServiceError::warehouse(format!("table {} not found: {}", table, e)))?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| ServiceError::warehouse(format!("cannot read table {}: {}", table, e)))
    }

    /// Column schema `table` was last written with
    pub fn table_schema(&self, table: &TableRef) -> Result<Vec<ColumnSpec>, ServiceError> {
        let path = self.schema_path(table);
        let text = fs::read_to_string(&path).map_err(|e| {
            ServiceError::warehouse(format!("schema of {} not found: {}", table, e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            ServiceError::warehouse(format!("schema of {} is corrupt: {}", table, e))
        })
    }

    fn execute(&self, request: &LoadRequest<'_>) -> Result<JobStatistics, ServiceError> {
        let table = request.table;
        let mut frame = conform(request.data, request.columns)?;
        let rows_loaded = frame.height();
        let exists = self.data_path(table).exists();

        match request.write_mode {
            WriteMode::Empty if exists => {
                let stored = self.read_table(table)?;
                if stored.height() > 0 {
                    return Err(ServiceError::warehouse(format!(
                        "table {} already contains {} rows",
                        table,
                        stored.height()
                    )));
                }
            }
            WriteMode::Append if exists => {
                let stored_columns = self.table_schema(table)?;
                if !same_layout(&stored_columns, request.columns) {
                    return Err(ServiceError::warehouse(format!(
                        "schema of {} does not match the stored table schema",
                        table
                    )));
                }
                let stored = self.read_table(table)?;
                frame = stored.vstack(&frame).map_err(|e| {
                    ServiceError::warehouse(format!("cannot append to {}: {}", table, e))
                })?;
            }
            _ => {}
        }

        self.write_table(table, &mut frame, request.columns)?;
        Ok(JobStatistics {
            rows_loaded,
            total_rows: frame.height(),
        })
    }

    fn write_table(
        &self,
        table: &TableRef,
        frame: &mut DataFrame,
        columns: &[ColumnSpec],
    ) -> Result<(), ServiceError> {
        let dir = self.table_dir(table);
        fs::create_dir_all(&dir).map_err(|e| {
            ServiceError::warehouse(format!("cannot create '{}': {}", dir.display(), e))
        })?;

        let mut data_file = temp_file_in(&dir)?;
        ParquetWriter::new(data_file.as_file_mut())
            .finish(frame)
            .map_err(|e| ServiceError::warehouse(format!("cannot write {}: {}", table, e)))?;

        let schema_json = serde_json::to_string_pretty(columns)
            .map_err(|e| ServiceError::warehouse(format!("cannot encode schema: {}", e)))?;
        let mut schema_file = temp_file_in(&dir)?;
        schema_file
            .write_all(schema_json.as_bytes())
            .map_err(|e| ServiceError::warehouse(format!("cannot write schema: {}", e)))?;

        persist(data_file, &self.data_path(table))?;
        persist(schema_file, &self.schema_path(table))?;
        debug!("Wrote {} rows to {}", frame.height(), table);
        Ok(())
    }
}

impl Warehouse for LocalWarehouse {
    fn default_project(&self) -> &str {
        &self.project
    }

    fn list_datasets(&self, project: &str) -> Result<Vec<String>, ServiceError> {
        check_identifier("project", project)?;
        list_children(&self.root.join(project), |path| {
            path.is_dir().then(|| file_name(path)).flatten()
        })
    }

    fn list_tables(&self, project: &str, dataset: &str) -> Result<Vec<String>, ServiceError> {
        check_identifier("project", project)?;
        check_identifier("dataset", dataset)?;
        list_children(&self.root.join(project).join(dataset), |path| {
            let is_data = path.extension().is_some_and(|ext| ext == DATA_SUFFIX);
            is_data
                .then(|| path.file_stem().and_then(|s| s.to_str()).map(str::to_string))
                .flatten()
        })
    }

    fn submit_load(&self, request: &LoadRequest<'_>) -> Result<LoadJob, ServiceError> {
        check_identifier("project", &request.table.project)?;
        check_identifier("dataset", &request.table.dataset)?;
        check_identifier("table", &request.table.table)?;

        let job_id = format!(
            "job_{}_{}",
            chrono::Utc::now().format("%Y%m%d%H%M%S"),
            self.next_job.fetch_add(1, Ordering::Relaxed)
        );
        info!(
            "Running load job {} into {} ({})",
            job_id, request.table, request.write_mode
        );

        let state = match self.execute(request) {
            Ok(stats) => JobState::Done(stats),
            Err(error) => JobState::Failed(error),
        };
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job_id.clone(), state);

        Ok(LoadJob {
            id: job_id,
            table: request.table.clone(),
        })
    }

    /// Collects the outcome; a job can only be waited for once
    fn wait_for_job(&self, job: &LoadJob) -> Result<JobStatistics, ServiceError> {
        let mut jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        match jobs.remove(&job.id) {
            Some(JobState::Done(stats)) => Ok(stats),
            Some(JobState::Failed(error)) => Err(error),
            None => Err(ServiceError::warehouse(format!("unknown job '{}'", job.id))),
        }
    }
}

/// Reshape `data` to the declared columns: schema order, declared types,
/// absent NULLABLE columns filled with nulls
fn conform(data: &DataFrame, columns: &[ColumnSpec]) -> Result<DataFrame, ServiceError> {
    for name in data.get_column_names() {
        if !columns.iter().any(|spec| spec.name == name.as_str()) {
            return Err(ServiceError::warehouse(format!(
                "column '{}' is not declared in the load schema",
                name
            )));
        }
    }

    let height = data.height();
    let mut out = Vec::with_capacity(columns.len());
    for spec in columns {
        let target = FieldType::from(spec.column_type.clone()).polars_dtype();
        let required = match FieldMode::try_from(spec.mode.clone()) {
            Ok(FieldMode::Required) => true,
            Ok(FieldMode::Nullable) => false,
            Ok(FieldMode::Repeated) | Err(_) => {
                return Err(ServiceError::warehouse(format!(
                    "column '{}': mode '{}' is not supported",
                    spec.name, spec.mode
                )));
            }
        };

        let series = match data.column(&spec.name) {
            Ok(column) => {
                let series = column.as_materialized_series();
                match &target {
                    Some(dtype) if series.dtype() != dtype => {
                        series.strict_cast(dtype).map_err(|e| {
                            ServiceError::warehouse(format!(
                                "column '{}': cannot store {} as {}: {}",
                                spec.name,
                                series.dtype(),
                                spec.column_type,
                                e
                            ))
                        })?
                    }
                    _ => series.clone(),
                }
            }
            Err(_) if required => {
                return Err(ServiceError::warehouse(format!(
                    "required column '{}' is missing",
                    spec.name
                )));
            }
            Err(_) => Series::full_null(
                spec.name.as_str().into(),
                height,
                &target.unwrap_or(DataType::String),
            ),
        };

        if required && series.null_count() > 0 {
            return Err(ServiceError::warehouse(format!(
                "required column '{}' contains {} nulls",
                spec.name,
                series.null_count()
            )));
        }
        out.push(series.into_column());
    }

    DataFrame::new(out).map_err(|e| ServiceError::warehouse(format!("invalid load data: {}", e)))
}

/// Same names, types and modes in the same order; descriptions may differ
fn same_layout(stored: &[ColumnSpec], incoming: &[ColumnSpec]) -> bool {
    stored.len() == incoming.len()
        && stored.iter().zip(incoming).all(|(a, b)| {
            a.name == b.name && a.column_type == b.column_type && a.mode == b.mode
        })
}

fn check_identifier(kind: &str, value: &str) -> Result<(), ServiceError> {
    let valid = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::warehouse(format!("invalid {} name '{}'", kind, value)))
    }
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
}

/// Sorted names of the direct children of `dir` accepted by `select`
fn list_children(
    dir: &Path,
    select: impl Fn(&Path) -> Option<String>,
) -> Result<Vec<String>, ServiceError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            ServiceError::warehouse(format!("cannot list '{}': {}", dir.display(), e))
        })?;
        if let Some(name) = select(entry.path()) {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn temp_file_in(dir: &Path) -> Result<NamedTempFile, ServiceError> {
    NamedTempFile::new_in(dir).map_err(|e| {
        ServiceError::warehouse(format!("cannot create temp file in '{}': {}", dir.display(), e))
    })
}

fn persist(file: NamedTempFile, path: &Path) -> Result<(), ServiceError> {
    file.persist(path)
        .map(|_| ())
        .map_err(|e| ServiceError::warehouse(format!("cannot replace '{}': {}", path.display(), e)))
}
