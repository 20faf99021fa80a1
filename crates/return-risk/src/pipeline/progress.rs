//! Stage tracking for pipeline runs.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::info;

/// Stages of a pipeline run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading input CSV files
    Loading,
    /// Joining raw tables into the master table
    Joining,
    /// Deriving delivery and target-encoded features
    FeatureEngineering,
    /// Filtering, imputation, split and scaling
    Preparing,
    /// Fitting and evaluating the classifier
    Training,
    /// Scoring the full population and selecting high-risk rows
    Scoring,
    /// Grouped return-rate summaries
    Analyzing,
    /// Writing output files
    Writing,
    Complete,
}

impl PipelineStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Loading => "Loading Data",
            Self::Joining => "Joining Tables",
            Self::FeatureEngineering => "Engineering Features",
            Self::Preparing => "Preparing Train/Test Data",
            Self::Training => "Training Model",
            Self::Scoring => "Scoring Population",
            Self::Analyzing => "Analyzing Return Rates",
            Self::Writing => "Writing Outputs",
            Self::Complete => "Complete",
        }
    }
}

/// Logs stage transitions with elapsed time.
#[derive(Debug)]
pub struct StageTracker {
    started: Instant,
    current: Option<PipelineStage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            current: None,
        }
    }

    /// Enter `stage` and log it.
    pub fn enter(&mut self, stage: PipelineStage) {
        self.current = Some(stage);
        info!(
            "[{:>6} ms] {}",
            self.started.elapsed().as_millis(),
            stage.display_name()
        );
    }

    pub fn current(&self) -> Option<PipelineStage> {
        self.current
    }

    /// Milliseconds since the tracker was created.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}
