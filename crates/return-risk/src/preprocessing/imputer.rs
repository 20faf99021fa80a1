//! Mean imputation over a feature matrix.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

/// Per-column mean imputer. NaN marks a missing cell.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MeanImputer {
    means: Option<Vec<f64>>,
}

impl MeanImputer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Learn the mean of every column over its non-NaN cells.
    ///
    /// `feature_names` is used only to name a column that has no values.
    pub fn fit(&mut self, x: &Array2<f64>, feature_names: &[&str]) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(PipelineError::NoValidValues("feature matrix".to_string()));
        }

        let mut means = Vec::with_capacity(x.ncols());
        for (j, column) in x.axis_iter(Axis(1)).enumerate() {
            let (sum, count) = column
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                let name = feature_names
                    .get(j)
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| format!("feature {j}"));
                return Err(PipelineError::NoValidValues(name));
            }
            means.push(sum / count as f64);
        }

        self.means = Some(means);
        Ok(self)
    }

    /// Replace NaN cells with the fitted column means.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let means = self
            .means
            .as_ref()
            .ok_or(PipelineError::NotFitted("MeanImputer"))?;
        if x.ncols() != means.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} columns", means.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mut out = x.clone();
        for (mut column, mean) in out.axis_iter_mut(Axis(1)).zip(means) {
            column.mapv_inplace(|v| if v.is_nan() { *mean } else { v });
        }
        Ok(out)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>, feature_names: &[&str]) -> Result<Array2<f64>> {
        self.fit(x, feature_names)?;
        self.transform(x)
    }

    /// Fitted column means.
    pub fn means(&self) -> Option<Array1<f64>> {
        self.means.as_ref().map(|m| Array1::from(m.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fit_transform_fills_nan() {
        let x = array![[1.0, f64::NAN], [3.0, 4.0], [f64::NAN, 8.0]];
        let mut imputer = MeanImputer::new();
        let out = imputer.fit_transform(&x, &["a", "b"]).unwrap();

        assert_eq!(out, array![[1.0, 6.0], [3.0, 4.0], [2.0, 8.0]]);
        assert_eq!(imputer.means().unwrap(), array![2.0, 6.0]);
    }

    #[test]
    fn test_transform_before_fit() {
        let imputer = MeanImputer::new();
        let err = imputer.transform(&array![[1.0]]).unwrap_err();
        assert_eq!(err.error_code(), "NOT_FITTED");
    }

    #[test]
    fn test_all_missing_column_names_feature() {
        let x = array![[1.0, f64::NAN], [2.0, f64::NAN]];
        let err = MeanImputer::new().fit(&x, &["a", "b"]).unwrap_err().to_string();
        assert!(err.contains("'b'"));
    }

    #[test]
    fn test_transform_uses_fitted_means_not_new_data() {
        let mut imputer = MeanImputer::new();
        imputer.fit(&array![[0.0], [10.0]], &["a"]).unwrap();

        let out = imputer.transform(&array![[100.0], [f64::NAN]]).unwrap();
        assert_eq!(out, array![[100.0], [5.0]]);
    }
}
