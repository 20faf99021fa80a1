//! Pipeline module.
//!
//! Stages hand off through files on disk: `join` writes the master table,
//! every later stage reads it back.

pub mod progress;
mod stages;

pub use progress::{PipelineStage, StageTracker};
pub use stages::{
    TrainingOutcome, analyze_master, run_all, run_analysis, run_feature_export, run_join,
    run_training, train_on_master,
};
