//! Model-ready preparation: feature selection, imputation, split and scaling.
//!
//! Fit order is fixed: the imputer sees the whole (filtered) feature matrix
//! before the split, the scaler sees only the training partition. Both are
//! returned so the exact same transforms can be replayed on the test
//! partition and on the scored population.

mod imputer;
mod scaler;
mod split;

pub use imputer::MeanImputer;
pub use scaler::{ScalerParams, StandardScaler};
pub use split::{SplitIndices, stratified_split, take_entries, take_rows};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::features::FeatureEngineer;
use crate::schema::require_columns;
use crate::utils::{f64_values, label_values};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use tracing::{debug, info};

/// Transformers fitted during one training run.
#[derive(Debug, Clone)]
pub struct FittedTransformers {
    pub imputer: MeanImputer,
    pub scaler: StandardScaler,
}

impl FittedTransformers {
    /// Impute then scale with the already-fitted parameters.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let imputed = self.imputer.transform(x)?;
        self.scaler.transform(&imputed)
    }
}

static_assertions::assert_impl_all!(FittedTransformers: Send, Sync, Clone);

/// Output of [`Splitter::prepare`].
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<i64>,
    pub y_test: Array1<i64>,
    pub transformers: FittedTransformers,
    /// Partition indices into the rows kept after dropping incomplete ones.
    pub split: SplitIndices,
    /// Rows dropped for missing features or label.
    pub rows_dropped: usize,
}

impl PreparedData {
    /// Share of positive labels in a partition.
    pub fn base_rate(labels: &Array1<i64>) -> f64 {
        if labels.is_empty() {
            return 0.0;
        }
        labels.iter().filter(|&&y| y == 1).count() as f64 / labels.len() as f64
    }
}

/// Builds train/test matrices from a master or engineered table.
pub struct Splitter;

impl Splitter {
    /// Run feature engineering, filtering, imputation, split and scaling.
    ///
    /// # Errors
    ///
    /// `ColumnNotFound` for absent feature/target columns, `TypeMismatch` when
    /// the target is not a 0/1 integer label, `InvalidSplit` when the filtered
    /// data cannot be stratified.
    pub fn prepare(df: &DataFrame, config: &PipelineConfig) -> Result<PreparedData> {
        let features = config.feature_names();
        let target = config.target_column.as_str();

        let engineered = FeatureEngineer::engineer(df)?;
        require_columns(&engineered, &features)?;
        require_columns(&engineered, &[target])?;

        let labels = binary_labels(&engineered, target)?;
        let raw = feature_matrix(&engineered, &features)?;

        let keep: Vec<usize> = (0..engineered.height())
            .filter(|&i| labels[i].is_some() && raw.row(i).iter().all(|v| !v.is_nan()))
            .collect();
        let rows_dropped = engineered.height() - keep.len();
        if rows_dropped > 0 {
            info!(
                "Dropped {} rows with missing features or '{}'",
                rows_dropped, target
            );
        }

        let x = take_rows(&raw, &keep);
        let y_values: Vec<i64> = keep.iter().filter_map(|&i| labels[i]).collect();

        let mut imputer = MeanImputer::new();
        let x_imputed = imputer.fit_transform(&x, &features)?;

        let split = stratified_split(&y_values, config.test_size, config.random_state)?;
        let y = Array1::from(y_values);

        let x_train = take_rows(&x_imputed, &split.train);
        let x_test = take_rows(&x_imputed, &split.test);
        let y_train = take_entries(&y, &split.train);
        let y_test = take_entries(&y, &split.test);

        let mut scaler = StandardScaler::new();
        let x_train = scaler.fit_transform(&x_train)?;
        let x_test = scaler.transform(&x_test)?;

        info!("Training samples: {}", x_train.nrows());
        info!("Testing samples: {}", x_test.nrows());
        debug!(
            "Base rate train {:.4}, test {:.4}",
            PreparedData::base_rate(&y_train),
            PreparedData::base_rate(&y_test)
        );

        Ok(PreparedData {
            x_train,
            x_test,
            y_train,
            y_test,
            transformers: FittedTransformers { imputer, scaler },
            split,
            rows_dropped,
        })
    }
}

/// Feature columns as a row-major matrix, with NaN for missing cells.
pub fn feature_matrix(df: &DataFrame, features: &[&str]) -> Result<Array2<f64>> {
    let n = df.height();
    let mut x = Array2::from_elem((n, features.len()), f64::NAN);
    for (j, name) in features.iter().enumerate() {
        for (i, value) in f64_values(df, name)?.into_iter().enumerate() {
            if let Some(v) = value {
                x[[i, j]] = v;
            }
        }
    }
    Ok(x)
}

/// Read the target as a 0/1 integer label; missing stays `None`.
pub fn binary_labels(df: &DataFrame, target: &str) -> Result<Vec<Option<i64>>> {
    label_values(df, target)?
        .into_iter()
        .map(|value| match value {
            None => Ok(None),
            Some(v) if v == 0.0 => Ok(Some(0)),
            Some(v) if v == 1.0 => Ok(Some(1)),
            Some(v) => Err(PipelineError::type_mismatch(
                target,
                "0/1 integer label",
                format!("found value {v}"),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Master table with `n` rows, every fifth row labelled 1.
    fn synthetic_master(n: usize) -> DataFrame {
        let labels: Vec<i32> = (0..n).map(|i| i32::from(i % 5 == 0)).collect();
        let sellers: Vec<String> = (0..n).map(|i| format!("s{}", i % 13)).collect();
        let categories: Vec<String> = (0..n).map(|i| format!("c{}", i % 7)).collect();
        let prices: Vec<f64> = (0..n).map(|i| 10.0 + (i % 17) as f64).collect();
        let freight: Vec<f64> = (0..n).map(|i| 1.0 + (i % 3) as f64).collect();
        let items: Vec<i64> = (0..n).map(|i| 1 + (i % 2) as i64).collect();
        let purchased: Vec<&str> = vec!["2018-01-01 08:00:00"; n];
        let delivered: Vec<String> = (0..n)
            .map(|i| format!("2018-01-{:02} 08:00:00", 2 + i % 20))
            .collect();
        let estimated: Vec<&str> = vec!["2018-01-15 00:00:00"; n];

        df![
            "order_id" => (0..n).map(|i| format!("o{i}")).collect::<Vec<_>>(),
            "seller_id" => sellers,
            "product_category_name" => categories,
            "price" => prices,
            "freight_value" => freight,
            "order_item_id" => items,
            "order_purchase_timestamp" => purchased,
            "order_delivered_customer_date" => delivered,
            "order_estimated_delivery_date" => estimated,
            "Is_Return" => labels,
        ]
        .unwrap()
    }

    #[test]
    fn test_prepare_shapes() {
        let df = synthetic_master(100);
        let prepared = Splitter::prepare(&df, &PipelineConfig::default()).unwrap();

        assert_eq!(prepared.x_train.dim(), (70, 7));
        assert_eq!(prepared.x_test.dim(), (30, 7));
        assert_eq!(prepared.y_train.len(), 70);
        assert_eq!(prepared.y_test.len(), 30);
        assert_eq!(prepared.rows_dropped, 0);
    }

    #[test]
    fn test_prepare_scales_train_to_zero_mean() {
        let df = synthetic_master(200);
        let prepared = Splitter::prepare(&df, &PipelineConfig::default()).unwrap();

        for column in prepared.x_train.columns() {
            let mean = column.sum() / column.len() as f64;
            assert!(mean.abs() < 1e-9);
        }
    }

    #[test]
    fn test_stratification_on_synthetic_table() {
        let df = synthetic_master(1500);
        let prepared = Splitter::prepare(&df, &PipelineConfig::default()).unwrap();

        let p = 0.2;
        assert!((PreparedData::base_rate(&prepared.y_train) - p).abs() <= 0.02);
        assert!((PreparedData::base_rate(&prepared.y_test) - p).abs() <= 0.02);
    }

    #[test]
    fn test_rows_missing_label_are_dropped() {
        let mut df = synthetic_master(50);
        let labels: Vec<Option<i32>> = (0..50)
            .map(|i| if i < 5 { None } else { Some(i32::from(i % 5 == 0)) })
            .collect();
        df.with_column(Series::new("Is_Return".into(), labels)).unwrap();

        let prepared = Splitter::prepare(&df, &PipelineConfig::default()).unwrap();
        assert_eq!(prepared.rows_dropped, 5);
        assert_eq!(prepared.y_train.len() + prepared.y_test.len(), 45);
    }

    #[test]
    fn test_scaler_ignores_test_partition_values() {
        let df = synthetic_master(300);
        let config = PipelineConfig::default();
        let first = Splitter::prepare(&df, &config).unwrap();

        // inflate the price of every test row and prepare again
        let mut prices: Vec<f64> = crate::utils::f64_values(&df, "price")
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect();
        for &i in &first.split.test {
            prices[i] *= 1000.0;
        }
        let mut altered = df.clone();
        altered
            .with_column(Series::new("price".into(), prices))
            .unwrap();
        let second = Splitter::prepare(&altered, &config).unwrap();

        assert_eq!(first.split, second.split);
        assert_eq!(
            first.transformers.scaler.params(),
            second.transformers.scaler.params()
        );
    }

    #[test]
    fn test_non_binary_target_is_type_mismatch() {
        let mut df = synthetic_master(20);
        let labels: Vec<i32> = (0..20).map(|i| (i % 3) as i32).collect();
        df.with_column(Series::new("Is_Return".into(), labels)).unwrap();

        let err = Splitter::prepare(&df, &PipelineConfig::default()).unwrap_err();
        assert_eq!(err.error_code(), "TYPE_MISMATCH");
    }

    #[test]
    fn test_boolean_target_reads_as_binary() {
        let df = df!["Is_Return" => [Some(true), Some(false), None]].unwrap();
        assert_eq!(
            binary_labels(&df, "Is_Return").unwrap(),
            vec![Some(1), Some(0), None]
        );
    }

    #[test]
    fn test_missing_feature_column() {
        let df = synthetic_master(20).drop("order_item_id").unwrap();
        let err = Splitter::prepare(&df, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::ColumnNotFound(ref c) if c == "order_item_id"));
    }

    #[test]
    fn test_accepts_already_engineered_input() {
        let df = synthetic_master(100);
        let engineered = FeatureEngineer::engineer(&df).unwrap();
        let a = Splitter::prepare(&df, &PipelineConfig::default()).unwrap();
        let b = Splitter::prepare(&engineered, &PipelineConfig::default()).unwrap();

        assert_eq!(a.x_train, b.x_train);
        assert_eq!(a.y_test, b.y_test);
    }
}
