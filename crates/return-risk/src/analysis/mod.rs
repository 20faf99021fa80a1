//! Descriptive return-rate summaries over the master table.

use crate::error::Result;
use crate::schema::{IS_RETURN, REVIEW_SCORE};
use crate::utils::{f64_values, mean_of_present, string_values};
use polars::prelude::DataFrame;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Return rate of one category or seller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRate {
    pub key: String,
    /// Rows with a defined label.
    pub count: usize,
    /// Mean label, in `[0, 1]`.
    pub rate: f64,
}

/// Share of rows per review score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreShare {
    pub score: i64,
    pub percent: f64,
}

/// Highest-rate groups among those with at least `min_count` labelled rows.
///
/// Sorted by rate descending, then count descending, then key. Rows with a
/// null key or null label are not counted.
pub fn group_return_rates(
    df: &DataFrame,
    key: &str,
    min_count: usize,
    top_n: usize,
) -> Result<Vec<GroupRate>> {
    let keys = string_values(df, key)?;
    let labels = f64_values(df, IS_RETURN)?;

    let mut groups: HashMap<String, (f64, usize)> = HashMap::new();
    for (k, y) in keys.into_iter().zip(labels) {
        if let (Some(k), Some(y)) = (k, y) {
            let entry = groups.entry(k).or_insert((0.0, 0));
            entry.0 += y;
            entry.1 += 1;
        }
    }

    let mut rates: Vec<GroupRate> = groups
        .into_iter()
        .filter(|(_, (_, count))| *count >= min_count)
        .map(|(key, (sum, count))| GroupRate {
            key,
            count,
            rate: sum / count as f64,
        })
        .collect();
    rates.sort_by(|a, b| {
        b.rate
            .total_cmp(&a.rate)
            .then(b.count.cmp(&a.count))
            .then_with(|| a.key.cmp(&b.key))
    });
    rates.truncate(top_n);
    Ok(rates)
}

/// Mean label over labelled rows, in percent.
pub fn overall_return_rate(df: &DataFrame) -> Result<Option<f64>> {
    Ok(mean_of_present(&f64_values(df, IS_RETURN)?).map(|m| m * 100.0))
}

/// Percentage of scored rows per review score, ascending by score.
pub fn review_score_distribution(df: &DataFrame) -> Result<Vec<ScoreShare>> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for score in f64_values(df, REVIEW_SCORE)?.into_iter().flatten() {
        *counts.entry(score.round() as i64).or_default() += 1;
    }

    let total: usize = counts.values().sum();
    Ok(counts
        .into_iter()
        .map(|(score, count)| ScoreShare {
            score,
            percent: count as f64 * 100.0 / total as f64,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use pretty_assertions::assert_eq;

    fn master() -> DataFrame {
        df![
            "product_category_name" => [Some("toys"), Some("toys"), Some("toys"), Some("books"), Some("books"), None],
            "review_score" => [Some(1i64), Some(5), Some(2), Some(4), Some(5), None],
            "Is_Return" => [Some(1i32), Some(0), Some(1), Some(0), Some(0), None],
        ]
        .unwrap()
    }

    #[test]
    fn test_group_rates_sorted_and_filtered() {
        let rates = group_return_rates(&master(), "product_category_name", 2, 10).unwrap();
        assert_eq!(
            rates,
            vec![
                GroupRate {
                    key: "toys".to_string(),
                    count: 3,
                    rate: 2.0 / 3.0
                },
                GroupRate {
                    key: "books".to_string(),
                    count: 2,
                    rate: 0.0
                },
            ]
        );

        let rates = group_return_rates(&master(), "product_category_name", 3, 10).unwrap();
        assert_eq!(rates.len(), 1);
        let rates = group_return_rates(&master(), "product_category_name", 1, 1).unwrap();
        assert_eq!(rates[0].key, "toys");
    }

    #[test]
    fn test_overall_rate_ignores_missing_labels() {
        let rate = overall_return_rate(&master()).unwrap().unwrap();
        assert!((rate - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_review_score_distribution() {
        let shares = review_score_distribution(&master()).unwrap();
        let scores: Vec<i64> = shares.iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![1, 2, 4, 5]);
        assert!((shares[3].percent - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_label_column() {
        let df = master().drop("Is_Return").unwrap();
        assert!(group_return_rates(&df, "product_category_name", 1, 10).unwrap_err().is_schema_error());
    }
}
