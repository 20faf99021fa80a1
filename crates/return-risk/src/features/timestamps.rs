//! Timestamp parsing and delivery-timing features.

use crate::error::{PipelineError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;

const SECONDS_PER_DAY: f64 = 86_400.0;

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an Olist-style timestamp.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (optionally with fractional seconds or a `T`
/// separator) and bare dates. Anything else is `None`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Read a timestamp column, coercing unparseable values to missing.
///
/// String columns are parsed; already-typed date/datetime columns go through
/// their string rendering so both shapes of input give the same result.
pub fn timestamp_values(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDateTime>>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::ColumnNotFound(name.to_string()))?;
    let as_text = column.as_materialized_series().cast(&DataType::String)?;

    Ok(as_text
        .str()?
        .into_iter()
        .map(|v| v.and_then(parse_timestamp))
        .collect())
}

/// Signed difference `later - earlier` in fractional days.
pub fn days_between(later: NaiveDateTime, earlier: NaiveDateTime) -> f64 {
    let delta = later - earlier;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0 / SECONDS_PER_DAY,
        None => delta.num_seconds() as f64 / SECONDS_PER_DAY,
    }
}

/// Actual minus estimated delivery, in days.
///
/// A missing delivered or estimated timestamp counts as on time (`0.0`).
pub fn delivery_delta_days(
    delivered: &[Option<NaiveDateTime>],
    estimated: &[Option<NaiveDateTime>],
) -> Vec<f64> {
    delivered
        .iter()
        .zip(estimated)
        .map(|pair| match pair {
            (Some(d), Some(e)) => days_between(*d, *e),
            _ => 0.0,
        })
        .collect()
}

/// Delivered minus purchased, in days; missing when either side is missing.
pub fn actual_delivery_days(
    delivered: &[Option<NaiveDateTime>],
    purchased: &[Option<NaiveDateTime>],
) -> Vec<Option<f64>> {
    delivered
        .iter()
        .zip(purchased)
        .map(|pair| match pair {
            (Some(d), Some(p)) => Some(days_between(*d, *p)),
            _ => None,
        })
        .collect()
}
