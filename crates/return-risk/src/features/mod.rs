//! Feature engineering over the joined master table.
//!
//! Adds delivery-timing features, group-mean risk encodings and renamed price
//! aliases. The output has the same rows as the input; raw columns are kept
//! untouched so the step can be re-applied to its own output.
//!
//! Two behaviours are known leakage hazards:
//!
//! - missing `actual_delivery_days` are filled with the mean over *this call's*
//!   input, so engineering different row subsets yields different fills;
//! - the risk encodings use the label of every input row, including rows that
//!   later land in the test partition.

mod target_encoding;
mod timestamps;

pub use target_encoding::GroupRateEncoder;
pub use timestamps::{
    actual_delivery_days, days_between, delivery_delta_days, parse_timestamp, timestamp_values,
};

use crate::error::Result;
use crate::schema::{
    ACTUAL_DELIVERY_DAYS, CATEGORY, CATEGORY_AVG_RETURN_RATE, DELIVERED_TS, DELIVERY_DELTA_DAYS,
    ESTIMATED_TS, FREIGHT_VALUE, FREIGHT_VALUE_PER_ITEM, IS_RETURN, PRICE, PRICE_PER_ITEM,
    PURCHASE_TS, SELLER_AVG_RETURN_RATE, SELLER_ID, require_columns,
};
use crate::utils::{fill_missing_with_mean, label_values, string_values};
use polars::prelude::*;
use tracing::{debug, info};

/// Columns the feature engineer reads.
pub const REQUIRED_COLUMNS: [&str; 8] = [
    IS_RETURN,
    PURCHASE_TS,
    DELIVERED_TS,
    ESTIMATED_TS,
    CATEGORY,
    SELLER_ID,
    PRICE,
    FREIGHT_VALUE,
];

/// Derives model features from a master table.
pub struct FeatureEngineer;

impl FeatureEngineer {
    /// Engineer all features, returning a new table with the same row count.
    ///
    /// # Errors
    ///
    /// `ColumnNotFound` when any of [`REQUIRED_COLUMNS`] is absent, and
    /// `TypeMismatch` when the label column is not numeric.
    pub fn engineer(df: &DataFrame) -> Result<DataFrame> {
        require_columns(df, &REQUIRED_COLUMNS)?;

        let purchased = timestamp_values(df, PURCHASE_TS)?;
        let delivered = timestamp_values(df, DELIVERED_TS)?;
        let estimated = timestamp_values(df, ESTIMATED_TS)?;

        let unparsed = delivered.iter().filter(|v| v.is_none()).count();
        debug!("{} rows without a usable delivery timestamp", unparsed);

        let delta = delivery_delta_days(&delivered, &estimated);
        let (actual, actual_fill) =
            fill_missing_with_mean(actual_delivery_days(&delivered, &purchased));
        if let Some(mean) = actual_fill {
            debug!("Filled missing '{}' with mean {:.3}", ACTUAL_DELIVERY_DAYS, mean);
        }

        let labels = label_values(df, IS_RETURN)?;
        let category_encoder = GroupRateEncoder::fit(&string_values(df, CATEGORY)?, &labels);
        let seller_encoder = GroupRateEncoder::fit(&string_values(df, SELLER_ID)?, &labels);
        debug!(
            "Risk encodings: {} categories, {} sellers, overall rate {:?}",
            category_encoder.n_groups(),
            seller_encoder.n_groups(),
            category_encoder.overall_rate()
        );

        let category_rates = category_encoder.transform(&string_values(df, CATEGORY)?);
        let seller_rates = seller_encoder.transform(&string_values(df, SELLER_ID)?);

        let price = Self::float_alias(df, PRICE, PRICE_PER_ITEM)?;
        let freight = Self::float_alias(df, FREIGHT_VALUE, FREIGHT_VALUE_PER_ITEM)?;

        let mut out = df.clone();
        out.with_column(Series::new(DELIVERY_DELTA_DAYS.into(), delta))?;
        out.with_column(Series::new(ACTUAL_DELIVERY_DAYS.into(), actual))?;
        out.with_column(Series::new(CATEGORY_AVG_RETURN_RATE.into(), category_rates))?;
        out.with_column(Series::new(SELLER_AVG_RETURN_RATE.into(), seller_rates))?;
        out.with_column(price)?;
        out.with_column(freight)?;

        info!("Feature engineering complete: {:?}", out.shape());
        Ok(out)
    }

    fn float_alias(df: &DataFrame, source: &str, alias: &str) -> Result<Series> {
        let series = df
            .column(source)?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        Ok(series.with_name(alias.into()))
    }
}
