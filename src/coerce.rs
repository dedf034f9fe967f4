//! Type coercion for columns declared INTEGER but read as floats.
//!
//! CSV readers and upstream APIs often produce float columns for integer
//! data as soon as a value is missing. Such columns are converted to
//! nullable `Int64` when every present value is integral. Any other
//! mismatch is left alone.

use crate::models::CoercionReport;
use crate::schema::{FieldType, TableSchema};
use polars::prelude::*;
use tracing::{debug, warn};

/// Convert float columns declared INTEGER to nullable integers in place.
///
/// Never changes the row count or the column set. Columns that cannot be
/// converted are reported in [`CoercionReport::skipped`] and left as is.
pub fn coerce_types(dataset: &mut DataFrame, schema: &TableSchema) -> CoercionReport {
    let mut report = CoercionReport::default();

    for field in schema.fields() {
        if field.field_type != FieldType::Integer {
            continue;
        }

        let converted = match dataset.column(&field.name) {
            Ok(column) if column.dtype().is_float() => float_to_int(column),
            Ok(_) => continue,
            Err(_) => {
                debug!("Column '{}' not in dataset, skipping coercion", field.name);
                continue;
            }
        };

        match converted.and_then(|series| dataset.with_column(series).map(|_| ())) {
            Ok(()) => {
                debug!("Converted column '{}' to nullable integer", field.name);
                report.converted.push(field.name.clone());
            }
            Err(e) => {
                warn!(
                    "Could not convert column '{}' to integer, leaving it unchanged: {}",
                    field.name, e
                );
                report.skipped.push((field.name.clone(), e.to_string()));
            }
        }
    }

    report
}

/// Nullable `Int64` copy of a float column, or an error naming the first
/// value that is not a whole number within range
fn float_to_int(column: &Column) -> PolarsResult<Series> {
    let floats = column.as_materialized_series().cast(&DataType::Float64)?;
    let values = floats.f64()?;

    if let Some(bad) = values
        .into_iter()
        .flatten()
        .find(|v| !is_whole_i64(*v))
    {
        return Err(PolarsError::ComputeError(
            format!("value {} is not an integer", bad).into(),
        ));
    }

    let ints: Int64Chunked = values
        .into_iter()
        .map(|value| value.map(|v| v as i64))
        .collect();
    Ok(ints.with_name(column.name().clone()).into_series())
}

fn is_whole_i64(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value >= i64::MIN as f64 && value < i64::MAX as f64
}
