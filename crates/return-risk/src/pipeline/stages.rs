//! Stage entry points. Each stage reads its inputs from disk, runs the pure
//! table functions, and writes its outputs only after every step succeeded.

use super::progress::{PipelineStage, StageTracker};
use crate::analysis::{group_return_rates, overall_return_rate, review_score_distribution};
use crate::config::PipelineConfig;
use crate::error::{Result, ResultExt};
use crate::features::FeatureEngineer;
use crate::io::{load_csv, stage_csv, stage_json, write_csv};
use crate::join::TableJoiner;
use crate::model::train_and_evaluate;
use crate::preprocessing::Splitter;
use crate::reporting::{AnalysisReport, ReportParams, TrainingReport};
use crate::schema::{CATEGORY, SELLER_ID};
use crate::scoring::Scorer;
use polars::prelude::*;
use tracing::info;

/// Result of a training run.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub report: TrainingReport,
    /// Rows at or above the risk threshold, highest score first.
    pub high_risk: DataFrame,
}

static_assertions::assert_impl_all!(TrainingOutcome: Send, Sync);

/// Join the four raw tables and write the master file.
pub fn run_join(config: &PipelineConfig) -> Result<DataFrame> {
    config.validate()?;
    let mut tracker = StageTracker::new();

    tracker.enter(PipelineStage::Loading);
    let orders = load_csv(config.orders_path())?;
    let items = load_csv(config.order_items_path())?;
    let products = load_csv(config.products_path())?;
    let reviews = load_csv(config.reviews_path())?;

    tracker.enter(PipelineStage::Joining);
    let mut master = TableJoiner::join_master_table(&orders, &items, &products, &reviews)?;

    tracker.enter(PipelineStage::Writing);
    write_csv(&mut master, config.master_path())?;

    tracker.enter(PipelineStage::Complete);
    Ok(master)
}

/// Engineer features on the master file and write the enriched table.
pub fn run_feature_export(config: &PipelineConfig) -> Result<DataFrame> {
    config.validate()?;
    let mut tracker = StageTracker::new();

    tracker.enter(PipelineStage::Loading);
    let master = load_csv(config.master_path())?;

    tracker.enter(PipelineStage::FeatureEngineering);
    let mut engineered = FeatureEngineer::engineer(&master)?;

    tracker.enter(PipelineStage::Writing);
    write_csv(&mut engineered, config.features_path())?;
    info!(
        "Feature table with {} rows written to {}",
        engineered.height(),
        config.features_path().display()
    );

    tracker.enter(PipelineStage::Complete);
    Ok(engineered)
}

/// Train on the master file, score every row, and write the high-risk
/// deliverable and the run report.
pub fn run_training(config: &PipelineConfig) -> Result<TrainingOutcome> {
    config.validate()?;
    let mut tracker = StageTracker::new();

    tracker.enter(PipelineStage::Loading);
    let master = load_csv(config.master_path())?;

    let mut outcome = train_on_master(&master, config, &mut tracker)?;

    tracker.enter(PipelineStage::Writing);
    // both files are complete on disk before either replaces its target
    let high_risk_file = stage_csv(&mut outcome.high_risk, config.high_risk_path())?;
    let report_file = stage_json(&outcome.report, config.report_path())?;
    high_risk_file.commit()?;
    report_file.commit()?;
    info!(
        "High-risk list saved: {} ({} rows)",
        config.high_risk_path().display(),
        outcome.high_risk.height()
    );

    tracker.enter(PipelineStage::Complete);
    Ok(outcome)
}

/// Training, evaluation and scoring on an in-memory master table.
///
/// Nothing is written to disk.
pub fn train_on_master(
    master: &DataFrame,
    config: &PipelineConfig,
    tracker: &mut StageTracker,
) -> Result<TrainingOutcome> {
    let features = config.feature_names();

    tracker.enter(PipelineStage::FeatureEngineering);
    let engineered = FeatureEngineer::engineer(master).context("During feature engineering")?;

    tracker.enter(PipelineStage::Preparing);
    let prepared = Splitter::prepare(&engineered, config).context("While preparing train/test data")?;

    tracker.enter(PipelineStage::Training);
    let trained = train_and_evaluate(&prepared, config)?;

    tracker.enter(PipelineStage::Scoring);
    let scored = Scorer::score_population(
        &engineered,
        &prepared.transformers,
        &trained.model,
        &features,
    )?;
    let high_risk = Scorer::select_high_risk(&scored, config.risk_threshold)?;

    let master_path = config.master_path();
    let output_path = config.high_risk_path();
    let params = ReportParams {
        master_file: &master_path,
        output_file: &output_path,
        rows_total: master.height(),
        test_size: config.test_size,
        random_state: config.random_state,
        risk_threshold: config.risk_threshold,
        high_risk_rows: high_risk.height(),
        duration_ms: tracker.elapsed_ms(),
    };
    let report = TrainingReport::build(params, &features, &prepared, &trained.model, &trained.metrics);

    Ok(TrainingOutcome { report, high_risk })
}

/// Descriptive return-rate summaries of the master file.
pub fn run_analysis(config: &PipelineConfig) -> Result<AnalysisReport> {
    config.validate()?;
    let mut tracker = StageTracker::new();

    tracker.enter(PipelineStage::Loading);
    let master = load_csv(config.master_path())?;

    tracker.enter(PipelineStage::Analyzing);
    let report = analyze_master(&master, config)?;

    tracker.enter(PipelineStage::Complete);
    Ok(report)
}

/// Summaries of an in-memory master table.
pub fn analyze_master(master: &DataFrame, config: &PipelineConfig) -> Result<AnalysisReport> {
    Ok(AnalysisReport::new(
        master.height(),
        overall_return_rate(master)?,
        review_score_distribution(master)?,
        group_return_rates(
            master,
            CATEGORY,
            config.category_min_count,
            config.summary_top_n,
        )?,
        group_return_rates(
            master,
            SELLER_ID,
            config.seller_min_count,
            config.summary_top_n,
        )?,
    ))
}

/// Join, then train.
pub fn run_all(config: &PipelineConfig) -> Result<TrainingOutcome> {
    run_join(config)?;
    run_training(config)
}
