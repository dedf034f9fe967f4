//! Warehouse loader: the pipeline entry point.
//!
//! A load aligns a dataset with its schema, coerces float columns declared
//! INTEGER, and submits a single load job. Warehouse failures are reported
//! in the returned [`LoadReport`] instead of as errors, so a caller always
//! learns what was dropped and converted along the way.

use crate::align::align;
use crate::coerce::coerce_types;
use crate::error::Result;
use crate::models::{LoadOutcome, LoadReport, LoadTarget, TableRef, WriteMode};
use crate::schema::TableSchema;
use crate::warehouse::{JobStatistics, LoadRequest, Warehouse};
use polars::prelude::DataFrame;
use tracing::{debug, error, info};

pub struct WarehouseLoader<W> {
    warehouse: W,
}

impl<W: Warehouse> WarehouseLoader<W> {
    pub fn new(warehouse: W) -> Self {
        Self { warehouse }
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    /// Load `dataset` into the table named by `target`.
    ///
    /// Only local DataFrame failures are returned as `Err`; a rejected
    /// submission or a failed job ends up in [`LoadReport::outcome`].
    pub fn load(
        &self,
        schema: TableSchema,
        dataset: DataFrame,
        target: &LoadTarget,
        write_mode: WriteMode,
    ) -> Result<LoadReport> {
        let table = target.resolve(self.warehouse.default_project());
        debug!(
            "Loading {} rows x {} columns into {}",
            dataset.height(),
            dataset.width(),
            table
        );

        let mut aligned = align(dataset, schema)?;
        let coercion = coerce_types(&mut aligned.dataset, &aligned.schema);
        if !coercion.converted.is_empty() {
            info!("Converted to integer: {:?}", coercion.converted);
        }

        let columns = aligned.schema.to_column_specs();
        let submitted_columns = aligned
            .dataset
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect();

        let request = LoadRequest {
            table: &table,
            columns: &columns,
            data: &aligned.dataset,
            write_mode,
        };
        let outcome = match self.run_job(&request) {
            Ok(stats) => {
                info!(
                    "Loaded {} rows into {} ({} rows total)",
                    stats.rows_loaded, table, stats.total_rows
                );
                LoadOutcome::Success
            }
            Err(e) => {
                error!("Load into {} failed: {}", table, e);
                LoadOutcome::Failed(e)
            }
        };

        Ok(LoadReport {
            table,
            write_mode,
            diff: aligned.diff,
            coercion,
            submitted_columns,
            outcome,
        })
    }

    /// Replace `dataset.table` with `df`, describing the columns from the
    /// DataFrame's own types
    pub fn export_dataframe(
        &self,
        df: DataFrame,
        dataset_table: &str,
        project: Option<&str>,
    ) -> Result<LoadReport> {
        let project = project.unwrap_or(self.warehouse.default_project());
        let table = TableRef::parse(dataset_table, project)?;
        let schema = TableSchema::infer_from_dataframe(&df);

        let target = LoadTarget::new(&table.dataset, &table.table).with_project(&table.project);
        let report = self.load(schema, df, &target, WriteMode::Truncate)?;
        if report.outcome.is_success() {
            info!("DataFrame exported to {}", report.table);
        }
        Ok(report)
    }

    fn run_job(
        &self,
        request: &LoadRequest<'_>,
    ) -> std::result::Result<JobStatistics, crate::error::ServiceError> {
        let job = self.warehouse.submit_load(request)?;
        debug!("Submitted job {} for {}", job.id, job.table);
        self.warehouse.wait_for_job(&job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::schema::{FieldMode, FieldSchema, FieldType};
    use crate::warehouse::RecordingWarehouse;
    use polars::prelude::*;

    fn xy_schema() -> TableSchema {
        TableSchema::new(vec![
            FieldSchema::new("x", FieldType::Integer),
            FieldSchema::new("y", FieldType::String).with_mode(FieldMode::Required),
        ])
        .unwrap()
    }

    fn xyz_data() -> DataFrame {
        df!(
            "x" => [Some(1.0), None],
            "y" => ["a", "b"],
            "z" => [true, false],
        )
        .unwrap()
    }

    #[test]
    fn test_load_aligns_coerces_and_submits() {
        let warehouse = RecordingWarehouse::new("acme");
        let loader = WarehouseLoader::new(&warehouse);

        let report = loader
            .load(
                xy_schema(),
                xyz_data(),
                &LoadTarget::new("sales", "orders"),
                WriteMode::Append,
            )
            .unwrap();

        assert!(report.outcome.is_success());
        assert_eq!(report.table, TableRef::new("acme", "sales", "orders"));
        assert_eq!(report.submitted_columns, vec!["x", "y"]);
        assert!(report.diff.dataset_only.contains("z"));
        assert!(report.diff.schema_only.is_empty());
        assert_eq!(report.coercion.converted, vec!["x".to_string()]);

        let loads = warehouse.loads();
        assert_eq!(loads.len(), 1);
        let load = &loads[0];
        assert_eq!(load.write_mode, WriteMode::Append);
        assert_eq!(load.data.width(), 2);
        assert_eq!(load.data.column("x").unwrap().dtype(), &DataType::Int64);

        let columns: Vec<(&str, &str, &str)> = load
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.column_type.as_str(), c.mode.as_str()))
            .collect();
        assert_eq!(
            columns,
            vec![("x", "INTEGER", "NULLABLE"), ("y", "STRING", "REQUIRED")]
        );
        assert!(load.columns.iter().all(|c| c.description.is_empty()));
    }

    #[test]
    fn test_explicit_project_overrides_default() {
        let warehouse = RecordingWarehouse::new("acme");
        let loader = WarehouseLoader::new(&warehouse);
        let target = LoadTarget::new("sales", "orders").with_project("other");

        let report = loader
            .load(xy_schema(), xyz_data(), &target, WriteMode::Truncate)
            .unwrap();

        assert_eq!(report.table.project, "other");
        assert_eq!(warehouse.list_datasets("other").unwrap(), vec!["sales"]);
        assert!(warehouse.list_datasets("acme").unwrap().is_empty());
    }

    #[test]
    fn test_submission_failure_is_reported() {
        let warehouse = RecordingWarehouse::new("acme")
            .failing_submit(ServiceError::warehouse("permission denied"));
        let loader = WarehouseLoader::new(&warehouse);

        let report = loader
            .load(
                xy_schema(),
                xyz_data(),
                &LoadTarget::new("sales", "orders"),
                WriteMode::Append,
            )
            .unwrap();

        match report.outcome {
            LoadOutcome::Failed(e) => assert_eq!(e.message, "permission denied"),
            _ => panic!("Expected Failed outcome"),
        }
        assert!(warehouse.loads().is_empty());
        // diagnostics survive the failure
        assert_eq!(report.submitted_columns, vec!["x", "y"]);
    }

    #[test]
    fn test_job_failure_is_reported() {
        let warehouse =
            RecordingWarehouse::new("acme").failing_jobs(ServiceError::warehouse("quota exceeded"));
        let loader = WarehouseLoader::new(&warehouse);

        let report = loader
            .load(
                xy_schema(),
                xyz_data(),
                &LoadTarget::new("sales", "orders"),
                WriteMode::Empty,
            )
            .unwrap();

        assert!(!report.outcome.is_success());
        assert_eq!(warehouse.loads().len(), 1);
    }

    #[test]
    fn test_export_replaces_table_with_inferred_schema() {
        let warehouse = RecordingWarehouse::new("acme");
        let loader = WarehouseLoader::new(&warehouse);
        let df = df!("id" => [1i64, 2], "rate" => [0.5, 0.25], "name" => ["a", "b"]).unwrap();

        let report = loader
            .export_dataframe(df, "fx.rates", Some("finance"))
            .unwrap();

        assert!(report.outcome.is_success());
        assert_eq!(report.table, TableRef::new("finance", "fx", "rates"));
        assert_eq!(report.write_mode, WriteMode::Truncate);

        let load = &warehouse.loads()[0];
        let types: Vec<&str> = load.columns.iter().map(|c| c.column_type.as_str()).collect();
        assert_eq!(types, vec!["INTEGER", "FLOAT", "STRING"]);
    }

    #[test]
    fn test_export_rejects_malformed_table_name() {
        let warehouse = RecordingWarehouse::new("acme");
        let loader = WarehouseLoader::new(&warehouse);
        let df = df!("id" => [1i64]).unwrap();

        let err = loader.export_dataframe(df, "rates", None).unwrap_err();
        match err {
            crate::error::TabloadError::Configuration { .. } => {}
            _ => panic!("Expected Configuration error"),
        }
        assert!(warehouse.loads().is_empty());
    }
}
