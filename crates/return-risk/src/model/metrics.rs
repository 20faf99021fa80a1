//! Binary classification metrics on the held-out partition.

use crate::error::{PipelineError, Result};
use ndarray::Array1;
use serde::Serialize;

/// Confusion matrix for the positive class `1`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &Array1<i64>, y_pred: &Array1<i64>) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            match (t == 1, p == 1) {
                (true, true) => cm.true_positive += 1,
                (false, false) => cm.true_negative += 1,
                (false, true) => cm.false_positive += 1,
                (true, false) => cm.false_negative += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

/// Test-partition evaluation of the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationMetrics {
    pub roc_auc: f64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion_matrix: ConfusionMatrix,
    pub support: usize,
}

impl ClassificationMetrics {
    /// Evaluate hard predictions and positive-class probabilities.
    pub fn evaluate(
        y_true: &Array1<i64>,
        y_pred: &Array1<i64>,
        y_proba: &Array1<f64>,
    ) -> Result<Self> {
        if y_true.len() != y_pred.len() || y_true.len() != y_proba.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} predictions", y_true.len()),
                actual: format!("{} labels, {} probabilities", y_pred.len(), y_proba.len()),
            });
        }

        let cm = ConfusionMatrix::from_predictions(y_true, y_pred);
        let precision = ratio(cm.true_positive, cm.true_positive + cm.false_positive);
        let recall = ratio(cm.true_positive, cm.true_positive + cm.false_negative);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Ok(Self {
            roc_auc: roc_auc(y_true, y_proba)?,
            accuracy: ratio(cm.true_positive + cm.true_negative, cm.total()),
            precision,
            recall,
            f1,
            confusion_matrix: cm,
            support: cm.total(),
        })
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Area under the ROC curve via the Mann-Whitney U statistic.
///
/// Tied scores receive their average rank. Needs both classes present.
pub fn roc_auc(y_true: &Array1<i64>, scores: &Array1<f64>) -> Result<f64> {
    let n_pos = y_true.iter().filter(|&&y| y == 1).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(PipelineError::NoValidValues(
            "ROC-AUC needs both classes in the evaluation labels".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based: the tie block covers start+1..=end
        let avg_rank = (start + 1 + end) as f64 / 2.0;
        positive_rank_sum += avg_rank * order[start..end].iter().filter(|&&i| y_true[i] == 1).count() as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let u = positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Ok(u / (n_pos * n_neg as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_perfect_ranking() {
        let y = array![0, 0, 1, 1];
        let s = array![0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&y, &s).unwrap(), 1.0);
    }

    #[test]
    fn test_inverted_ranking() {
        let y = array![1, 1, 0, 0];
        let s = array![0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&y, &s).unwrap(), 0.0);
    }

    #[test]
    fn test_ties_count_half() {
        let y = array![0, 1];
        let s = array![0.5, 0.5];
        assert_eq!(roc_auc(&y, &s).unwrap(), 0.5);

        // one positive beats 1 of 2 negatives, ties the other
        let y = array![0, 0, 1];
        let s = array![0.2, 0.7, 0.7];
        assert_eq!(roc_auc(&y, &s).unwrap(), 0.75);
    }

    #[test]
    fn test_single_class_auc_fails() {
        assert!(roc_auc(&array![1, 1], &array![0.2, 0.3]).is_err());
    }

    #[test]
    fn test_evaluate() {
        let y_true = array![1, 1, 0, 0, 0];
        let y_pred = array![1, 0, 1, 0, 0];
        let y_proba = array![0.9, 0.4, 0.6, 0.2, 0.1];
        let m = ClassificationMetrics::evaluate(&y_true, &y_pred, &y_proba).unwrap();

        assert_eq!(
            m.confusion_matrix,
            ConfusionMatrix {
                true_negative: 2,
                false_positive: 1,
                false_negative: 1,
                true_positive: 1,
            }
        );
        assert_eq!(m.accuracy, 0.6);
        assert_eq!(m.precision, 0.5);
        assert_eq!(m.recall, 0.5);
        assert_eq!(m.f1, 0.5);
        assert!((m.roc_auc - 5.0 / 6.0).abs() < 1e-12);
        assert_eq!(m.support, 5);
    }

    #[test]
    fn test_no_positive_predictions() {
        let m = ClassificationMetrics::evaluate(
            &array![1, 0],
            &array![0, 0],
            &array![0.3, 0.1],
        )
        .unwrap();
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.f1, 0.0);
    }
}
