//! Column names shared across the pipeline stages.
//!
//! Raw column names follow the Olist public dataset; engineered and output
//! column names are the ones written to the intermediate and deliverable CSVs.

use crate::error::{PipelineError, Result};
use polars::prelude::*;

// =============================================================================
// Raw / master columns
// =============================================================================

pub const ORDER_ID: &str = "order_id";
pub const PRODUCT_ID: &str = "product_id";
pub const SELLER_ID: &str = "seller_id";
pub const CUSTOMER_ID: &str = "customer_id";
pub const ORDER_STATUS: &str = "order_status";
pub const ORDER_ITEM_ID: &str = "order_item_id";
pub const PRICE: &str = "price";
pub const FREIGHT_VALUE: &str = "freight_value";
pub const CATEGORY: &str = "product_category_name";
pub const PURCHASE_TS: &str = "order_purchase_timestamp";
pub const DELIVERED_TS: &str = "order_delivered_customer_date";
pub const ESTIMATED_TS: &str = "order_estimated_delivery_date";
pub const REVIEW_SCORE: &str = "review_score";
pub const REVIEW_CREATION_DATE: &str = "review_creation_date";

/// Binary "bad experience" label: 1 iff the review score is at most 2.
pub const IS_RETURN: &str = "Is_Return";

// =============================================================================
// Engineered / scored columns
// =============================================================================

pub const DELIVERY_DELTA_DAYS: &str = "delivery_delta_days";
pub const ACTUAL_DELIVERY_DAYS: &str = "actual_delivery_days";
pub const CATEGORY_AVG_RETURN_RATE: &str = "category_avg_return_rate";
pub const SELLER_AVG_RETURN_RATE: &str = "seller_avg_return_rate";
pub const PRICE_PER_ITEM: &str = "price_per_item";
pub const FREIGHT_VALUE_PER_ITEM: &str = "freight_value_per_item";
pub const RETURN_RISK_SCORE: &str = "Return_Risk_Score";

/// Numeric features fed to the classifier, in matrix column order.
pub const NUMERICAL_FEATURES: [&str; 7] = [
    PRICE_PER_ITEM,
    FREIGHT_VALUE_PER_ITEM,
    DELIVERY_DELTA_DAYS,
    ACTUAL_DELIVERY_DAYS,
    CATEGORY_AVG_RETURN_RATE,
    SELLER_AVG_RETURN_RATE,
    ORDER_ITEM_ID,
];

/// Projection of the high-risk deliverable.
pub const EXPORT_COLUMNS: [&str; 7] = [
    ORDER_ID,
    PRODUCT_ID,
    CATEGORY,
    SELLER_ID,
    PRICE,
    FREIGHT_VALUE,
    RETURN_RISK_SCORE,
];

/// Fail with [`PipelineError::ColumnNotFound`] for the first absent column.
pub fn require_columns<S: AsRef<str>>(df: &DataFrame, columns: &[S]) -> Result<()> {
    for name in columns {
        let name = name.as_ref();
        if df.column(name).is_err() {
            return Err(PipelineError::ColumnNotFound(name.to_string()));
        }
    }
    Ok(())
}
