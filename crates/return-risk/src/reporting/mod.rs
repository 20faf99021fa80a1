//! Run summaries written next to the deliverables.
//!
//! [`TrainingReport`] is serialized to `model_report.json` by the training
//! stage and printed with `--json`. [`AnalysisReport`] carries the
//! descriptive summaries of the analysis stage.

use crate::analysis::{GroupRate, ScoreShare};
use crate::model::{ClassificationMetrics, LogisticRegression};
use crate::preprocessing::{PreparedData, ScalerParams};
use chrono::Local;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Row count and positive share of one partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartitionSummary {
    pub rows: usize,
    pub base_rate: f64,
}

/// Summary of one training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub generated_at: String,
    pub master_file: String,
    pub output_file: String,
    /// Rows in the master table.
    pub rows_total: usize,
    /// Rows dropped for a missing feature or label before the split.
    pub rows_dropped: usize,
    pub train: PartitionSummary,
    pub test: PartitionSummary,
    pub test_size: f64,
    pub random_state: u64,
    /// Coefficient per feature, on the standardized scale.
    pub coefficients: BTreeMap<String, f64>,
    pub intercept: f64,
    pub iterations: usize,
    pub scaler: Option<ScalerParams>,
    pub metrics: ClassificationMetrics,
    pub risk_threshold: f64,
    pub high_risk_rows: usize,
    /// Wall time from loading the master table to the end of scoring.
    pub duration_ms: u64,
}

/// Inputs of [`TrainingReport::build`] that are not part of the fitted state.
#[derive(Debug, Clone, Copy)]
pub struct ReportParams<'a> {
    pub master_file: &'a Path,
    pub output_file: &'a Path,
    pub rows_total: usize,
    pub test_size: f64,
    pub random_state: u64,
    pub risk_threshold: f64,
    pub high_risk_rows: usize,
    pub duration_ms: u64,
}

impl TrainingReport {
    pub fn build(
        params: ReportParams<'_>,
        features: &[&str],
        prepared: &PreparedData,
        model: &LogisticRegression,
        metrics: &ClassificationMetrics,
    ) -> Self {
        let coefficients = features
            .iter()
            .zip(model.coefficients().unwrap_or_default())
            .map(|(name, value)| (name.to_string(), *value))
            .collect();

        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            master_file: params.master_file.display().to_string(),
            output_file: params.output_file.display().to_string(),
            rows_total: params.rows_total,
            rows_dropped: prepared.rows_dropped,
            train: PartitionSummary {
                rows: prepared.y_train.len(),
                base_rate: PreparedData::base_rate(&prepared.y_train),
            },
            test: PartitionSummary {
                rows: prepared.y_test.len(),
                base_rate: PreparedData::base_rate(&prepared.y_test),
            },
            test_size: params.test_size,
            random_state: params.random_state,
            coefficients,
            intercept: model.intercept().unwrap_or_default(),
            iterations: model.n_iter(),
            scaler: prepared.transformers.scaler.params().cloned(),
            metrics: metrics.clone(),
            risk_threshold: params.risk_threshold,
            high_risk_rows: params.high_risk_rows,
            duration_ms: params.duration_ms,
        }
    }
}

/// Descriptive summaries of the master table.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub generated_at: String,
    pub rows: usize,
    /// Percent of labelled rows with `Is_Return = 1`.
    pub overall_return_rate: Option<f64>,
    pub review_score_distribution: Vec<ScoreShare>,
    pub top_categories: Vec<GroupRate>,
    pub top_sellers: Vec<GroupRate>,
}

impl AnalysisReport {
    pub fn new(
        rows: usize,
        overall_return_rate: Option<f64>,
        review_score_distribution: Vec<ScoreShare>,
        top_categories: Vec<GroupRate>,
        top_sellers: Vec<GroupRate>,
    ) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            rows,
            overall_return_rate,
            review_score_distribution,
            top_categories,
            top_sellers,
        }
    }

    /// Plain-text rendering for the terminal.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("Rows: {}\n", self.rows));
        if let Some(rate) = self.overall_return_rate {
            out.push_str(&format!(
                "Overall 'Bad Experience' rate (review score <= 2): {:.2}%\n",
                rate
            ));
        }

        out.push_str("\nReview score distribution:\n");
        for share in &self.review_score_distribution {
            out.push_str(&format!("  {}: {:.2}%\n", share.score, share.percent));
        }

        for (title, groups) in [
            ("Top high-risk categories", &self.top_categories),
            ("Top high-risk sellers", &self.top_sellers),
        ] {
            out.push_str(&format!("\n{}:\n", title));
            for group in groups {
                out.push_str(&format!(
                    "  {:<40} {:>7} rows  {:>6.2}%\n",
                    group.key,
                    group.count,
                    group.rate * 100.0
                ));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ConfusionMatrix;
    use crate::preprocessing::{FittedTransformers, MeanImputer, SplitIndices, StandardScaler};
    use ndarray::array;

    #[test]
    fn test_training_report_serializes() {
        let mut model = LogisticRegression::new();
        model
            .fit(&array![[-1.0], [-0.5], [0.5], [1.0]], &array![0, 0, 1, 1])
            .unwrap();
        let prepared = PreparedData {
            x_train: array![[-1.0], [-0.5], [0.5], [1.0]],
            x_test: array![[0.0], [0.2]],
            y_train: array![0, 0, 1, 1],
            y_test: array![0, 1],
            transformers: FittedTransformers {
                imputer: MeanImputer::new(),
                scaler: StandardScaler::new(),
            },
            split: SplitIndices {
                train: vec![0, 1, 2, 3],
                test: vec![4, 5],
            },
            rows_dropped: 1,
        };
        let metrics = ClassificationMetrics {
            roc_auc: 1.0,
            accuracy: 1.0,
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
            confusion_matrix: ConfusionMatrix::default(),
            support: 2,
        };
        let params = ReportParams {
            master_file: Path::new("data/df_master_day1.csv"),
            output_file: Path::new("outputs/high_risk_products_for_intervention.csv"),
            rows_total: 7,
            test_size: 0.3,
            random_state: 42,
            risk_threshold: 0.6,
            high_risk_rows: 1,
            duration_ms: 12,
        };

        let report = TrainingReport::build(params, &["price_per_item"], &prepared, &model, &metrics);
        assert_eq!(report.train.rows, 4);
        assert_eq!(report.test.base_rate, 0.5);
        assert_eq!(report.rows_dropped, 1);
        assert!(report.coefficients["price_per_item"] > 0.0);
        assert_eq!(report.duration_ms, 12);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["metrics"]["roc_auc"], 1.0);
        assert_eq!(json["random_state"], 42);
    }

    #[test]
    fn test_analysis_report_text() {
        let report = AnalysisReport::new(
            3,
            Some(66.666),
            vec![ScoreShare {
                score: 1,
                percent: 100.0,
            }],
            vec![GroupRate {
                key: "toys".to_string(),
                count: 3,
                rate: 0.5,
            }],
            vec![],
        );
        let text = report.to_text();
        assert!(text.contains("66.67%"));
        assert!(text.contains("toys"));
        assert!(text.contains("50.00%"));
    }
}
