//! CLI entry point for the return-risk pipeline.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use return_risk::{
    AnalysisReport, PipelineConfig, TrainingOutcome, run_all, run_analysis, run_feature_export,
    run_join, run_training,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Bad-experience risk scoring for e-commerce order items",
    long_about = "Joins the Olist orders, items, products and reviews tables, trains a\n\
                  class-balanced logistic regression on the Is_Return label (review\n\
                  score <= 2) and exports the order items at high risk.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  RETURN_RISK_DATA_DIR    Default directory of the input CSV files\n\n\
                  EXAMPLES:\n  \
                  # Build the master table, then train and export\n  \
                  return-risk join\n  \
                  return-risk train\n\n  \
                  # Everything in one go, with a custom data folder\n  \
                  return-risk --data-dir ./olist run\n\n  \
                  # Category and seller return rates as JSON\n  \
                  return-risk analyze --json"
)]
struct Args {
    /// Directory holding the raw Olist CSV files
    #[arg(short, long, env = "RETURN_RISK_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Directory for the master table and every output file
    #[arg(short, long, default_value = "./outputs")]
    output_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only the final JSON is written.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Join the raw tables into df_master_day1.csv
    Join,
    /// Write the master table with engineered features (df_master_for_powerbi.csv)
    Features,
    /// Train, evaluate and export high_risk_products_for_intervention.csv
    Train,
    /// Print return rates per category and seller
    Analyze,
    /// Join, then train
    Run,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    // .env must be loaded before clap reads RETURN_RISK_DATA_DIR
    dotenv().ok();

    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    let config = PipelineConfig::builder()
        .data_dir(&args.data_dir)
        .output_dir(&args.output_dir)
        .build()
        .context("Invalid pipeline configuration")?;

    info!("Data directory: {}", config.data_dir.display());
    info!("Output directory: {}", config.output_dir.display());

    match args.command {
        Command::Join => {
            let master = run_join(&config)?;
            if args.json {
                print_json(&serde_json::json!({
                    "master_file": config.master_path(),
                    "rows": master.height(),
                    "columns": master.width(),
                }))?;
            } else if !args.quiet {
                println!(
                    "Master table: {} ({} rows x {} columns)",
                    config.master_path().display(),
                    master.height(),
                    master.width()
                );
            }
        }
        Command::Features => {
            let engineered = run_feature_export(&config)?;
            if args.json {
                print_json(&serde_json::json!({
                    "features_file": config.features_path(),
                    "rows": engineered.height(),
                    "columns": engineered.width(),
                }))?;
            } else if !args.quiet {
                println!(
                    "Feature table: {} ({} rows x {} columns)",
                    config.features_path().display(),
                    engineered.height(),
                    engineered.width()
                );
            }
        }
        Command::Train | Command::Run => {
            let outcome = if matches!(args.command, Command::Run) {
                run_all(&config)?
            } else {
                run_training(&config)?
            };
            if args.json {
                print_json(&outcome.report)?;
            } else {
                print_training_summary(&outcome, &config);
            }
        }
        Command::Analyze => {
            let report = run_analysis(&config)?;
            if args.json {
                print_json(&report)?;
            } else {
                print_analysis_summary(&report);
            }
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a human-readable summary of a training run.
///
/// Printed with `println!` so it shows regardless of log level.
fn print_training_summary(outcome: &TrainingOutcome, config: &PipelineConfig) {
    let report = &outcome.report;
    let metrics = &report.metrics;
    let cm = &metrics.confusion_matrix;

    println!();
    println!("{}", "=".repeat(80));
    println!("RETURN-RISK MODEL TRAINED");
    println!("{}", "=".repeat(80));
    println!();
    println!("Master table: {} ({} rows)", report.master_file, report.rows_total);
    println!(
        "Train/test:   {} / {} rows (base rate {:.2}% / {:.2}%), {} dropped",
        report.train.rows,
        report.test.rows,
        report.train.base_rate * 100.0,
        report.test.base_rate * 100.0,
        report.rows_dropped
    );
    println!();

    println!("Held-out evaluation:");
    println!("  ROC-AUC:   {:.4}", metrics.roc_auc);
    println!("  Accuracy:  {:.4}", metrics.accuracy);
    println!("  Precision: {:.4}", metrics.precision);
    println!("  Recall:    {:.4}", metrics.recall);
    println!("  F1:        {:.4}", metrics.f1);
    println!();
    println!("                Predicted 0  Predicted 1");
    println!("  Actual 0:     {:>11}  {:>11}", cm.true_negative, cm.false_positive);
    println!("  Actual 1:     {:>11}  {:>11}", cm.false_negative, cm.true_positive);
    println!();

    println!("Coefficients (standardized features):");
    for (name, value) in &report.coefficients {
        println!("  {:<28} {:>+9.4}", name, value);
    }
    println!("  {:<28} {:>+9.4}", "(intercept)", report.intercept);
    println!();

    println!(
        "High-risk items (score >= {}): {}",
        report.risk_threshold, report.high_risk_rows
    );
    println!("Output: {}", report.output_file);
    println!("Report: {}", config.report_path().display());
    println!("{}", "=".repeat(80));
}

fn print_analysis_summary(report: &AnalysisReport) {
    println!();
    println!("{}", "=".repeat(80));
    println!("RETURN-RATE ANALYSIS");
    println!("{}", "=".repeat(80));
    print!("{}", report.to_text());
    println!("{}", "=".repeat(80));
}
