//! Dataset/schema column reconciliation.
//!
//! Alignment keeps the columns present on both sides and reports the rest.
//! Mismatches are never errors: they are logged and returned so the caller
//! can decide what to do with them.

use crate::models::AlignmentDiff;
use crate::schema::TableSchema;
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Dataset and schema restricted to their common columns
#[derive(Debug, Clone)]
pub struct Alignment {
    pub dataset: DataFrame,
    pub schema: TableSchema,
    pub diff: AlignmentDiff,
}

/// Restrict `dataset` and `schema` to the columns they share.
///
/// The dataset keeps its own column order and the schema keeps its field
/// order. An empty dataset or an empty schema is returned untouched with an
/// empty diff.
pub fn align(dataset: DataFrame, schema: TableSchema) -> PolarsResult<Alignment> {
    if dataset.height() == 0 || dataset.width() == 0 || schema.is_empty() {
        warn!(
            "Skipping alignment: dataset has {} rows x {} columns, schema has {} fields",
            dataset.height(),
            dataset.width(),
            schema.len()
        );
        return Ok(Alignment {
            dataset,
            schema,
            diff: AlignmentDiff::default(),
        });
    }

    let schema_names: BTreeSet<String> = schema.names().map(str::to_string).collect();
    let data_columns: BTreeSet<String> = dataset
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let diff = AlignmentDiff {
        dataset_only: data_columns.difference(&schema_names).cloned().collect(),
        schema_only: schema_names.difference(&data_columns).cloned().collect(),
    };
    if !diff.dataset_only.is_empty() {
        warn!("Columns not in schema, dropped: {:?}", diff.dataset_only);
    }
    if !diff.schema_only.is_empty() {
        warn!("Schema fields missing from dataset, dropped: {:?}", diff.schema_only);
    }

    let valid: BTreeSet<String> = schema_names.intersection(&data_columns).cloned().collect();
    let keep: Vec<String> = dataset
        .get_column_names()
        .iter()
        .filter(|name| valid.contains(name.as_str()))
        .map(|name| name.to_string())
        .collect();
    debug!("Keeping {} aligned columns", keep.len());

    Ok(Alignment {
        dataset: dataset.select(keep)?,
        schema: schema.retain_names(&valid),
        diff,
    })
}
