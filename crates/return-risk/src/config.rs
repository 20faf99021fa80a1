//! Configuration for the return-risk pipeline.
//!
//! The modelling constants (feature list, target, test fraction, seed and risk
//! threshold) are fixed defaults; callers normally only change directories.

use crate::error::PipelineError;
use crate::schema::{IS_RETURN, NUMERICAL_FEATURES};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const ORDERS_FILE: &str = "olist_orders_dataset.csv";
pub const ORDER_ITEMS_FILE: &str = "olist_order_items_dataset.csv";
pub const PRODUCTS_FILE: &str = "olist_products_dataset.csv";
pub const REVIEWS_FILE: &str = "olist_order_reviews_dataset.csv";

pub const MASTER_FILE: &str = "df_master_day1.csv";
pub const FEATURES_FILE: &str = "df_master_for_powerbi.csv";
pub const HIGH_RISK_FILE: &str = "high_risk_products_for_intervention.csv";
pub const REPORT_FILE: &str = "model_report.json";

/// Configuration for a pipeline run.
///
/// Use [`PipelineConfig::builder()`] to override defaults.
///
/// # Example
///
/// ```rust,ignore
/// use return_risk::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .data_dir("data/olist")
///     .output_dir("outputs")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory holding the four raw Olist CSV files.
    /// Default: "data"
    pub data_dir: PathBuf,

    /// Directory for the master table, feature export, deliverable and report.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// Numeric feature columns, in matrix column order.
    pub feature_columns: Vec<String>,

    /// Binary label column.
    /// Default: "Is_Return"
    pub target_column: String,

    /// Fraction of rows held out for evaluation (0.0 - 1.0, exclusive).
    /// Default: 0.3
    pub test_size: f64,

    /// Seed for the stratified split.
    /// Default: 42
    pub random_state: u64,

    /// Minimum score for a row to be exported as high risk.
    /// Default: 0.6
    pub risk_threshold: f64,

    /// Inverse L2 regularization strength of the classifier.
    /// Default: 1.0
    pub regularization_c: f64,

    /// Maximum Newton iterations when fitting the classifier.
    /// Default: 100
    pub max_iter: usize,

    /// Convergence tolerance on the Newton step norm.
    /// Default: 1e-8
    pub tolerance: f64,

    /// Minimum items for a category to appear in the risk summary.
    /// Default: 100
    pub category_min_count: usize,

    /// Minimum sales for a seller to appear in the risk summary.
    /// Default: 50
    pub seller_min_count: usize,

    /// Number of rows kept in each risk summary.
    /// Default: 10
    pub summary_top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("outputs"),
            feature_columns: NUMERICAL_FEATURES.iter().map(|s| s.to_string()).collect(),
            target_column: IS_RETURN.to_string(),
            test_size: 0.3,
            random_state: 42,
            risk_threshold: 0.6,
            regularization_c: 1.0,
            max_iter: 100,
            tolerance: 1e-8,
            category_min_count: 100,
            seller_min_count: 50,
            summary_top_n: 10,
        }
    }
}

static_assertions::assert_impl_all!(PipelineConfig: Send, Sync, Clone);

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.test_size.is_nan() || self.test_size <= 0.0 || self.test_size >= 1.0 {
            return Err(ConfigValidationError::InvalidFraction {
                field: "test_size".to_string(),
                value: self.test_size,
            });
        }

        if !(0.0..=1.0).contains(&self.risk_threshold) {
            return Err(ConfigValidationError::InvalidFraction {
                field: "risk_threshold".to_string(),
                value: self.risk_threshold,
            });
        }

        if self.feature_columns.is_empty() {
            return Err(ConfigValidationError::EmptyFeatureList);
        }

        if self.target_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyTarget);
        }

        if self.feature_columns.contains(&self.target_column) {
            return Err(ConfigValidationError::TargetIsFeature(
                self.target_column.clone(),
            ));
        }

        if self.regularization_c.is_nan() || self.regularization_c <= 0.0 {
            return Err(ConfigValidationError::InvalidRegularization(
                self.regularization_c,
            ));
        }

        if self.max_iter == 0 {
            return Err(ConfigValidationError::InvalidMaxIter(self.max_iter));
        }

        Ok(())
    }

    pub fn orders_path(&self) -> PathBuf {
        self.data_dir.join(ORDERS_FILE)
    }

    pub fn order_items_path(&self) -> PathBuf {
        self.data_dir.join(ORDER_ITEMS_FILE)
    }

    pub fn products_path(&self) -> PathBuf {
        self.data_dir.join(PRODUCTS_FILE)
    }

    pub fn reviews_path(&self) -> PathBuf {
        self.data_dir.join(REVIEWS_FILE)
    }

    /// Joined master table written by the join stage.
    pub fn master_path(&self) -> PathBuf {
        self.output_dir.join(MASTER_FILE)
    }

    /// Master table with all engineered features, for BI tooling.
    pub fn features_path(&self) -> PathBuf {
        self.output_dir.join(FEATURES_FILE)
    }

    /// High-risk deliverable.
    pub fn high_risk_path(&self) -> PathBuf {
        self.output_dir.join(HIGH_RISK_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE)
    }

    /// Feature column names as string slices.
    pub fn feature_names(&self) -> Vec<&str> {
        self.feature_columns.iter().map(String::as_str).collect()
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{field}': {value} (must be a fraction in range)")]
    InvalidFraction { field: String, value: f64 },

    #[error("Feature list must not be empty")]
    EmptyFeatureList,

    #[error("Target column name must not be empty")]
    EmptyTarget,

    #[error("Target column '{0}' is also listed as a feature")]
    TargetIsFeature(String),

    #[error("Invalid regularization strength: {0} (must be positive)")]
    InvalidRegularization(f64),

    #[error("Invalid max iterations: {0} (must be at least 1)")]
    InvalidMaxIter(usize),
}

impl From<ConfigValidationError> for PipelineError {
    fn from(err: ConfigValidationError) -> Self {
        PipelineError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    feature_columns: Option<Vec<String>>,
    target_column: Option<String>,
    test_size: Option<f64>,
    random_state: Option<u64>,
    risk_threshold: Option<f64>,
    regularization_c: Option<f64>,
    max_iter: Option<usize>,
    tolerance: Option<f64>,
    category_min_count: Option<usize>,
    seller_min_count: Option<usize>,
    summary_top_n: Option<usize>,
}

impl PipelineConfigBuilder {
    /// Set the directory holding the raw input files.
    pub fn data_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.data_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the directory for intermediate and output files.
    pub fn output_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.output_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Replace the feature list.
    pub fn feature_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Set the held-out fraction.
    ///
    /// # Arguments
    /// * `fraction` - Value strictly between 0.0 and 1.0 (e.g., 0.3 = 30%)
    pub fn test_size(mut self, fraction: f64) -> Self {
        self.test_size = Some(fraction);
        self
    }

    pub fn random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn risk_threshold(mut self, threshold: f64) -> Self {
        self.risk_threshold = Some(threshold);
        self
    }

    pub fn regularization_c(mut self, c: f64) -> Self {
        self.regularization_c = Some(c);
        self
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = Some(max_iter);
        self
    }

    pub fn tolerance(mut self, tol: f64) -> Self {
        self.tolerance = Some(tol);
        self
    }

    /// Set the volume filters for the category and seller risk summaries.
    pub fn summary_min_counts(mut self, category: usize, seller: usize) -> Self {
        self.category_min_count = Some(category);
        self.seller_min_count = Some(seller);
        self
    }

    pub fn summary_top_n(mut self, n: usize) -> Self {
        self.summary_top_n = Some(n);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            feature_columns: self.feature_columns.unwrap_or(defaults.feature_columns),
            target_column: self.target_column.unwrap_or(defaults.target_column),
            test_size: self.test_size.unwrap_or(defaults.test_size),
            random_state: self.random_state.unwrap_or(defaults.random_state),
            risk_threshold: self.risk_threshold.unwrap_or(defaults.risk_threshold),
            regularization_c: self.regularization_c.unwrap_or(defaults.regularization_c),
            max_iter: self.max_iter.unwrap_or(defaults.max_iter),
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
            category_min_count: self
                .category_min_count
                .unwrap_or(defaults.category_min_count),
            seller_min_count: self.seller_min_count.unwrap_or(defaults.seller_min_count),
            summary_top_n: self.summary_top_n.unwrap_or(defaults.summary_top_n),
        };

        config.validate()?;
        Ok(config)
    }
}
