//! Standardization (zero mean, unit variance) of a feature matrix.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

/// Fitted per-column centre and scale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScalerParams {
    pub mean: Vec<f64>,
    /// Population standard deviation; zero-variance columns scale by 1.
    pub scale: Vec<f64>,
}

/// Z-score scaler: `(x - mean) / std`.
///
/// Fit only on training rows; the same parameters are then applied to the
/// test partition and to the scored population.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StandardScaler {
    params: Option<ScalerParams>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, x: &Array2<f64>) -> Result<&mut Self> {
        if x.nrows() == 0 {
            return Err(PipelineError::NoValidValues("training partition".to_string()));
        }

        let n = x.nrows() as f64;
        let mut mean = Vec::with_capacity(x.ncols());
        let mut scale = Vec::with_capacity(x.ncols());

        for column in x.axis_iter(Axis(1)) {
            let mu = column.sum() / n;
            let var = column.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / n;
            let std = var.sqrt();
            mean.push(mu);
            scale.push(if std > f64::EPSILON { std } else { 1.0 });
        }

        self.params = Some(ScalerParams { mean, scale });
        Ok(self)
    }

    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let params = self
            .params
            .as_ref()
            .ok_or(PipelineError::NotFitted("StandardScaler"))?;
        if x.ncols() != params.mean.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} columns", params.mean.len()),
                actual: format!("{} columns", x.ncols()),
            });
        }

        let mean = Array1::from(params.mean.clone());
        let scale = Array1::from(params.scale.clone());
        Ok((x - &mean) / &scale)
    }

    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    pub fn params(&self) -> Option<&ScalerParams> {
        self.params.as_ref()
    }
}
