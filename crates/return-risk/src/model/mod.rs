//! Return-risk classifier and its evaluation.

mod logistic;
mod metrics;

pub use logistic::LogisticRegression;
pub use metrics::{ClassificationMetrics, ConfusionMatrix, roc_auc};

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::preprocessing::PreparedData;
use tracing::info;

/// Fitted classifier plus its held-out evaluation.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    pub model: LogisticRegression,
    pub metrics: ClassificationMetrics,
}

/// Fit on the scaled training partition and evaluate on the test partition.
pub fn train_and_evaluate(prepared: &PreparedData, config: &PipelineConfig) -> Result<TrainedModel> {
    let mut model = LogisticRegression::new()
        .with_c(config.regularization_c)
        .with_max_iter(config.max_iter)
        .with_tol(config.tolerance);
    model.fit(&prepared.x_train, &prepared.y_train)?;

    let y_proba = model.predict_proba(&prepared.x_test)?;
    let y_pred = model.predict(&prepared.x_test)?;
    let metrics = ClassificationMetrics::evaluate(&prepared.y_test, &y_pred, &y_proba)?;

    info!("ROC-AUC on test partition: {:.4}", metrics.roc_auc);
    info!(
        "Accuracy {:.4}, precision {:.4}, recall {:.4}, F1 {:.4}",
        metrics.accuracy, metrics.precision, metrics.recall, metrics.f1
    );

    Ok(TrainedModel { model, metrics })
}
