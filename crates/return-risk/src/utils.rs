//! Shared column helpers for the pipeline stages.
//!
//! Stages read polars columns into plain vectors, compute row-wise, and write
//! new Series back. Missing values are `None`; NaN in float columns is read
//! as missing too.

use crate::error::{PipelineError, Result};
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Column Extraction
// =============================================================================

/// Read a column as `f64`, treating nulls and NaN as missing.
///
/// Values that do not convert (e.g. free text in a numeric column) become
/// missing; use [`label_values`] where that must be an error instead.
pub fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))?;
    let casted = column
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Read a label column as `f64`, failing when any present value is not numeric.
///
/// Boolean columns read as 0/1.
pub fn label_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))?;
    let series = column.as_materialized_series();

    let castable = is_numeric_dtype(series.dtype())
        || matches!(series.dtype(), DataType::String | DataType::Boolean);
    if !castable {
        return Err(PipelineError::type_mismatch(
            name,
            "numeric label",
            format!("unsupported dtype {}", series.dtype()),
        ));
    }

    let casted = series.strict_cast(&DataType::Float64).map_err(|e| {
        PipelineError::type_mismatch(name, "numeric label", e.to_string())
    })?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Read a column as owned strings, casting non-string dtypes.
pub fn string_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))?;
    let casted = column.as_materialized_series().cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Gather rows by position, in the given order.
pub fn take_df_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    Ok(df.take(&IdxCa::from_vec("idx".into(), idx))?)
}

// =============================================================================
// Statistics
// =============================================================================

/// Mean of the present values, `None` when there are none.
pub fn mean_of_present(values: &[Option<f64>]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Fill missing values with the mean of the present ones.
///
/// Returns the filled values and the mean used (if any). When nothing is
/// present the values are returned unchanged.
pub fn fill_missing_with_mean(values: Vec<Option<f64>>) -> (Vec<Option<f64>>, Option<f64>) {
    match mean_of_present(&values) {
        Some(mean) => (
            values.into_iter().map(|v| Some(v.unwrap_or(mean))).collect(),
            Some(mean),
        ),
        None => (values, None),
    }
}
