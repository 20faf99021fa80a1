//! Return-Risk Pipeline Library
//!
//! Batch pipeline that flags order line items at high risk of a bad customer
//! experience (review score of 2 or less, the `Is_Return` label) in the Olist
//! e-commerce dataset.
//!
//! # Overview
//!
//! - **Join**: items, products, orders and reviews into one master table
//! - **Feature Engineering**: delivery timing and group-mean target encodings
//! - **Preparation**: drop incomplete rows, mean imputation, stratified split,
//!   standard scaling fitted on the training partition
//! - **Model**: class-balanced L2 logistic regression, evaluated on the
//!   held-out partition
//! - **Scoring**: risk score for every row and the high-risk export
//! - **Analysis**: return rates per category and per seller
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use return_risk::{PipelineConfig, run_join, run_training};
//!
//! let config = PipelineConfig::builder()
//!     .data_dir("data")
//!     .output_dir("outputs")
//!     .build()?;
//!
//! run_join(&config)?;
//! let outcome = run_training(&config)?;
//! println!("ROC-AUC: {:.4}", outcome.report.metrics.roc_auc);
//! ```
//!
//! Stages communicate only through files: `run_join` writes
//! `df_master_day1.csv` and the later stages read it back. The table-level
//! functions ([`TableJoiner`], [`FeatureEngineer`], [`Splitter`], [`Scorer`])
//! are pure and can be used on in-memory frames directly.

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod join;
pub mod model;
pub mod pipeline;
pub mod preprocessing;
pub mod reporting;
pub mod schema;
pub mod scoring;
pub mod utils;

// Re-exports for convenient access
pub use analysis::{GroupRate, ScoreShare, group_return_rates, overall_return_rate, review_score_distribution};
pub use config::{ConfigValidationError, PipelineConfig, PipelineConfigBuilder};
pub use error::{PipelineError, Result as PipelineResult, ResultExt};
pub use features::{FeatureEngineer, GroupRateEncoder};
pub use join::TableJoiner;
pub use model::{ClassificationMetrics, ConfusionMatrix, LogisticRegression, TrainedModel};
pub use pipeline::{
    PipelineStage, StageTracker, TrainingOutcome, run_all, run_analysis, run_feature_export,
    run_join, run_training,
};
pub use preprocessing::{
    FittedTransformers, MeanImputer, PreparedData, ScalerParams, SplitIndices, Splitter,
    StandardScaler,
};
pub use reporting::{AnalysisReport, TrainingReport};
pub use scoring::Scorer;

