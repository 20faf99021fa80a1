//! Builds the master table: one row per order line item with its product
//! category, order timestamps, latest review score and the `Is_Return` label.

use crate::analysis::overall_return_rate;
use crate::error::{Result, ResultExt};
use crate::features::timestamp_values;
use crate::schema::*;
use crate::utils::{f64_values, string_values, take_df_rows};
use polars::prelude::*;
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::info;

/// Order columns carried into the master table.
pub const ORDER_COLUMNS: [&str; 6] = [
    ORDER_ID,
    CUSTOMER_ID,
    ORDER_STATUS,
    PURCHASE_TS,
    DELIVERED_TS,
    ESTIMATED_TS,
];

/// Item columns the later stages rely on.
pub const ITEM_COLUMNS: [&str; 6] = [
    ORDER_ID,
    ORDER_ITEM_ID,
    PRODUCT_ID,
    SELLER_ID,
    PRICE,
    FREIGHT_VALUE,
];

/// Joins the four raw tables.
pub struct TableJoiner;

impl TableJoiner {
    /// Left-join items with products, orders and deduplicated reviews, then
    /// derive the label.
    ///
    /// The item row order is preserved.
    pub fn join_master_table(
        orders: &DataFrame,
        items: &DataFrame,
        products: &DataFrame,
        reviews: &DataFrame,
    ) -> Result<DataFrame> {
        require_columns(items, &ITEM_COLUMNS).context("order items table")?;
        require_columns(products, &[PRODUCT_ID, CATEGORY]).context("products table")?;
        require_columns(orders, &ORDER_COLUMNS).context("orders table")?;
        require_columns(reviews, &[ORDER_ID, REVIEW_SCORE, REVIEW_CREATION_DATE])
            .context("reviews table")?;

        let products = products.select([PRODUCT_ID, CATEGORY])?;
        let master = left_join(items, &products, PRODUCT_ID)?;
        info!("After joining with products. Shape: {:?}", master.shape());

        let orders = orders.select(ORDER_COLUMNS)?;
        let master = left_join(&master, &orders, ORDER_ID)?;
        info!("After joining with orders. Shape: {:?}", master.shape());

        let reviews = latest_reviews(reviews)?.select([ORDER_ID, REVIEW_SCORE])?;
        let mut master = left_join(&master, &reviews, ORDER_ID)?;
        info!("Final master table shape: {:?}", master.shape());

        let labels = derive_label(&master)?;
        master.with_column(labels)?;

        if let Some(rate) = overall_return_rate(&master)? {
            info!("Overall 'Bad Experience' rate (review score <= 2): {:.2}%", rate);
        }

        Ok(master)
    }
}

/// Keep one review per order: the one with the latest creation date.
///
/// Unparseable or missing dates rank after every valid date; among equal
/// dates the first row wins. Reviews without an order id are dropped.
pub fn latest_reviews(reviews: &DataFrame) -> Result<DataFrame> {
    let order_ids = string_values(reviews, ORDER_ID)?;
    let created = timestamp_values(reviews, REVIEW_CREATION_DATE)?;

    let mut order: Vec<usize> = (0..reviews.height()).collect();
    order.sort_by(|&a, &b| match (created[a], created[b]) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    let mut seen = HashSet::new();
    let keep: Vec<usize> = order
        .into_iter()
        .filter(|&i| match &order_ids[i] {
            Some(id) => seen.insert(id.as_str()),
            None => false,
        })
        .collect();

    let deduped = take_df_rows(reviews, &keep)?;
    if deduped.height() < reviews.height() {
        info!(
            "Dropped {} duplicate reviews",
            reviews.height() - deduped.height()
        );
    }
    Ok(deduped)
}

/// `Is_Return`: 1 when the review score is at most 2, 0 when above, null
/// when there is no score.
pub fn derive_label(df: &DataFrame) -> Result<Series> {
    let labels: Vec<Option<i32>> = f64_values(df, REVIEW_SCORE)?
        .into_iter()
        .map(|score| score.map(|s| i32::from(s <= 2.0)))
        .collect();
    Ok(Series::new(IS_RETURN.into(), labels))
}

/// Left join on a single key column, compared as strings.
///
/// Every left row appears at least once and in its original order; a left row
/// matching several right rows is repeated once per match, in right-table
/// order. Right columns are null where there is no match, and a right column
/// whose name is already taken gets the `_right` suffix.
pub fn left_join(left: &DataFrame, right: &DataFrame, key: &str) -> Result<DataFrame> {
    let mut args = JoinArgs::new(JoinType::Left);
    args.maintain_order = MaintainOrderJoin::LeftRight;
    let joined = left
        .clone()
        .lazy()
        .with_column(col(key).cast(DataType::String))
        .join(
            right
                .clone()
                .lazy()
                .with_column(col(key).cast(DataType::String)),
            [col(key)],
            [col(key)],
            args,
        )
        .collect()?;
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn orders() -> DataFrame {
        df![
            "order_id" => ["o1", "o2", "o3"],
            "customer_id" => ["c1", "c2", "c3"],
            "order_status" => ["delivered", "delivered", "shipped"],
            "order_purchase_timestamp" => ["2018-01-01 10:00:00", "2018-01-02 10:00:00", "2018-01-03 10:00:00"],
            "order_delivered_customer_date" => [Some("2018-01-05 10:00:00"), Some("2018-01-09 10:00:00"), None],
            "order_estimated_delivery_date" => ["2018-01-10 00:00:00", "2018-01-08 00:00:00", "2018-01-12 00:00:00"],
        ]
        .unwrap()
    }

    fn items() -> DataFrame {
        df![
            "order_id" => ["o1", "o2", "o2", "o3"],
            "order_item_id" => [1i64, 1, 2, 1],
            "product_id" => ["p1", "p2", "p3", "p9"],
            "seller_id" => ["s1", "s2", "s2", "s3"],
            "price" => [10.0, 20.0, 30.0, 40.0],
            "freight_value" => [1.0, 2.0, 3.0, 4.0],
        ]
        .unwrap()
    }

    fn products() -> DataFrame {
        df![
            "product_id" => ["p1", "p2", "p3"],
            "product_category_name" => [Some("toys"), Some("bed_bath"), None],
            "product_weight_g" => [100i64, 200, 300],
        ]
        .unwrap()
    }

    fn reviews() -> DataFrame {
        df![
            "review_id" => ["r1", "r2", "r3", "r4"],
            "order_id" => ["o1", "o2", "o2", "o3"],
            "review_score" => [1i64, 5, 4, 2],
            "review_creation_date" => ["2018-01-06 00:00:00", "2018-01-10 00:00:00", "2018-01-11 00:00:00", "2018-01-13 00:00:00"],
        ]
        .unwrap()
    }

    #[test]
    fn test_join_preserves_item_rows() {
        let master = TableJoiner::join_master_table(&orders(), &items(), &products(), &reviews()).unwrap();

        assert_eq!(master.height(), 4);
        assert_eq!(
            string_values(&master, "product_id").unwrap(),
            vec![
                Some("p1".to_string()),
                Some("p2".to_string()),
                Some("p3".to_string()),
                Some("p9".to_string())
            ]
        );
        // unknown product p9 has no category
        assert_eq!(string_values(&master, CATEGORY).unwrap()[3], None);
        assert_eq!(
            string_values(&master, CUSTOMER_ID).unwrap()[2],
            Some("c2".to_string())
        );
        assert!(master.column("product_weight_g").is_err());
    }

    #[test]
    fn test_latest_review_wins() {
        let master = TableJoiner::join_master_table(&orders(), &items(), &products(), &reviews()).unwrap();

        // o2 has scores 5 (older) and 4 (newer)
        let scores = f64_values(&master, REVIEW_SCORE).unwrap();
        assert_eq!(scores, vec![Some(1.0), Some(4.0), Some(4.0), Some(2.0)]);
        let labels = f64_values(&master, IS_RETURN).unwrap();
        assert_eq!(labels, vec![Some(1.0), Some(0.0), Some(0.0), Some(1.0)]);
    }

    #[test]
    fn test_unparseable_review_date_ranks_last() {
        let reviews = df![
            "order_id" => ["o1", "o1"],
            "review_score" => [1i64, 5],
            "review_creation_date" => ["not a date", "2018-01-01 00:00:00"],
        ]
        .unwrap();

        let latest = latest_reviews(&reviews).unwrap();
        assert_eq!(latest.height(), 1);
        assert_eq!(f64_values(&latest, REVIEW_SCORE).unwrap(), vec![Some(5.0)]);
    }

    #[test]
    fn test_label_from_scores() {
        let df = df!["review_score" => [1i64, 5, 2]].unwrap();
        let labels = derive_label(&df).unwrap();
        let values: Vec<Option<i32>> = labels.i32().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some(1), Some(0), Some(1)]);

        let mut with_label = df.clone();
        with_label.with_column(labels).unwrap();
        let rate = overall_return_rate(&with_label).unwrap().unwrap();
        assert!((rate - 66.6667).abs() < 1e-3);
    }

    #[test]
    fn test_missing_score_gives_null_label() {
        let df = df!["review_score" => [Some(3i64), None, Some(1)]].unwrap();
        let labels = derive_label(&df).unwrap();
        assert_eq!(labels.null_count(), 1);
    }

    #[test]
    fn test_order_without_review() {
        let reviews = take_df_rows(&reviews(), &[0, 1, 2]).unwrap();
        let master = TableJoiner::join_master_table(&orders(), &items(), &products(), &reviews).unwrap();

        let labels = f64_values(&master, IS_RETURN).unwrap();
        assert_eq!(labels[3], None);
    }

    #[test]
    fn test_left_join_repeats_multiple_matches() {
        let left = df!["k" => ["a", "b"], "x" => [1i64, 2]].unwrap();
        let right = df!["k" => ["a", "a"], "y" => [10i64, 20]].unwrap();
        let joined = left_join(&left, &right, "k").unwrap();

        assert_eq!(joined.height(), 3);
        assert_eq!(
            f64_values(&joined, "y").unwrap(),
            vec![Some(10.0), Some(20.0), None]
        );
    }

    #[test]
    fn test_left_join_suffixes_clashing_columns() {
        let left = df!["k" => ["a", "b"], "x" => [1i64, 2]].unwrap();
        let right = df!["k" => ["b"], "x" => [20i64]].unwrap();
        let joined = left_join(&left, &right, "k").unwrap();

        assert_eq!(f64_values(&joined, "x").unwrap(), vec![Some(1.0), Some(2.0)]);
        assert_eq!(
            f64_values(&joined, "x_right").unwrap(),
            vec![None, Some(20.0)]
        );
    }

    #[test]
    fn test_left_join_matches_integer_and_string_keys() {
        let left = df!["k" => [1i64, 2, 3], "x" => [1i64, 2, 3]].unwrap();
        let right = df!["k" => ["3", "1"], "y" => [30i64, 10]].unwrap();
        let joined = left_join(&left, &right, "k").unwrap();

        assert_eq!(
            f64_values(&joined, "y").unwrap(),
            vec![Some(10.0), None, Some(30.0)]
        );
    }

    #[test]
    fn test_missing_column_names_table() {
        let orders = orders().drop(ORDER_STATUS).unwrap();
        let err = TableJoiner::join_master_table(&orders, &items(), &products(), &reviews()).unwrap_err();

        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
        assert!(err.to_string().contains("order_status"));
        assert!(err.to_string().contains("orders table"));
    }
}
