//! Population scoring and high-risk selection.

use crate::error::Result;
use crate::model::LogisticRegression;
use crate::preprocessing::{FittedTransformers, feature_matrix};
use crate::schema::{EXPORT_COLUMNS, RETURN_RISK_SCORE, require_columns};
use crate::utils::{f64_values, take_df_rows};
use polars::prelude::*;
use tracing::info;

/// Applies a trained model to every row of an engineered table.
pub struct Scorer;

impl Scorer {
    /// Add `Return_Risk_Score` to every row.
    ///
    /// Features are transformed with the transformers fitted during training;
    /// nothing is re-fit here. Missing feature cells take the imputer means.
    pub fn score_population(
        df: &DataFrame,
        transformers: &FittedTransformers,
        model: &LogisticRegression,
        features: &[&str],
    ) -> Result<DataFrame> {
        require_columns(df, features)?;

        let raw = feature_matrix(df, features)?;
        let scaled = transformers.transform(&raw)?;
        let scores = model.predict_proba(&scaled)?;

        let mut scored = df.clone();
        scored.with_column(Series::new(RETURN_RISK_SCORE.into(), scores.to_vec()))?;
        Ok(scored)
    }

    /// Rows with score `>= threshold`, highest score first, projected to the
    /// deliverable columns.
    ///
    /// Rows with equal scores keep their input order.
    pub fn select_high_risk(scored: &DataFrame, threshold: f64) -> Result<DataFrame> {
        require_columns(scored, &EXPORT_COLUMNS)?;

        let scores = f64_values(scored, RETURN_RISK_SCORE)?;
        let mut selected: Vec<(usize, f64)> = scores
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.filter(|&v| v >= threshold).map(|v| (i, v)))
            .collect();
        selected.sort_by(|a, b| b.1.total_cmp(&a.1));

        let indices: Vec<usize> = selected.into_iter().map(|(i, _)| i).collect();
        let high_risk = take_df_rows(scored, &indices)?.select(EXPORT_COLUMNS)?;

        info!(
            "{} of {} rows at or above risk threshold {}",
            high_risk.height(),
            scored.height(),
            threshold
        );
        Ok(high_risk)
    }
}
