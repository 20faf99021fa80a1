//! L2-regularized logistic regression with balanced class weights.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;
use tracing::{debug, warn};

/// Binary logistic regression.
///
/// Minimizes `0.5 * ||w||² + C * Σ s_i * logloss_i` where `s_i` is the
/// balanced weight of the row's class, `n / (2 * n_class)`. The intercept is
/// not penalized. Fitted with Newton steps; each step solves the Hessian
/// system by Cholesky decomposition.
#[derive(Debug, Clone, Serialize)]
pub struct LogisticRegression {
    /// Inverse regularization strength.
    pub c: f64,
    pub max_iter: usize,
    /// Stop when the Newton step norm drops below this.
    pub tol: f64,
    /// Reweight classes to equal total influence.
    pub balanced: bool,
    coefficients: Option<Vec<f64>>,
    intercept: Option<f64>,
    n_iter: usize,
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(LogisticRegression: Send, Sync, Clone);

impl LogisticRegression {
    pub fn new() -> Self {
        Self {
            c: 1.0,
            max_iter: 100,
            tol: 1e-8,
            balanced: true,
            coefficients: None,
            intercept: None,
            n_iter: 0,
        }
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_balanced(mut self, balanced: bool) -> Self {
        self.balanced = balanced;
        self
    }

    fn sigmoid(z: f64) -> f64 {
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let e = z.exp();
            e / (1.0 + e)
        }
    }

    /// Per-row sample weights.
    fn sample_weights(y: &Array1<i64>) -> Result<Array1<f64>> {
        let n = y.len() as f64;
        let positives = y.iter().filter(|&&v| v == 1).count() as f64;
        let negatives = n - positives;
        if positives == 0.0 || negatives == 0.0 {
            return Err(PipelineError::InvalidSplit(
                "training labels contain a single class".to_string(),
            ));
        }
        let w_pos = n / (2.0 * positives);
        let w_neg = n / (2.0 * negatives);
        Ok(y.mapv(|v| if v == 1 { w_pos } else { w_neg }))
    }

    /// Fit on a scaled feature matrix and 0/1 labels.
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<&mut Self> {
        let (n_samples, n_features) = x.dim();
        if n_samples != y.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("y length = {}", n_samples),
                actual: format!("y length = {}", y.len()),
            });
        }
        if let Some(bad) = y.iter().find(|&&v| v != 0 && v != 1) {
            return Err(PipelineError::type_mismatch(
                "label",
                "0/1 integer label",
                format!("found value {bad}"),
            ));
        }

        let weights = if self.balanced {
            Self::sample_weights(y)?
        } else {
            Array1::ones(n_samples)
        };
        let targets = y.mapv(|v| v as f64);

        // Augmented design matrix: last column is the intercept.
        let dim = n_features + 1;
        let mut design = Array2::ones((n_samples, dim));
        design
            .slice_mut(ndarray::s![.., ..n_features])
            .assign(x);

        let mut beta = Array1::<f64>::zeros(dim);
        let mut converged = false;

        for iter in 0..self.max_iter {
            let probs = design.dot(&beta).mapv(Self::sigmoid);

            let residual = &weights * &(&probs - &targets);
            let mut gradient = design.t().dot(&residual) * self.c;
            for j in 0..n_features {
                gradient[j] += beta[j];
            }

            let curvature = &weights * &probs.mapv(|p| p * (1.0 - p));
            let weighted = &design * &curvature.view().insert_axis(Axis(1));
            let mut hessian = design.t().dot(&weighted) * self.c;
            for j in 0..n_features {
                hessian[[j, j]] += 1.0;
            }

            let step = cholesky_solve(&hessian, &gradient).ok_or_else(|| {
                PipelineError::NoValidValues("Hessian is not positive definite".to_string())
            })?;
            beta -= &step;
            self.n_iter = iter + 1;

            let step_norm = step.mapv(|v| v * v).sum().sqrt();
            if step_norm < self.tol {
                converged = true;
                break;
            }
        }

        if converged {
            debug!("Logistic regression converged in {} iterations", self.n_iter);
        } else {
            warn!(
                "Logistic regression did not converge in {} iterations",
                self.max_iter
            );
        }

        self.intercept = Some(beta[n_features]);
        self.coefficients = Some(beta.slice(ndarray::s![..n_features]).to_vec());
        Ok(self)
    }

    /// Probability of label 1 for every row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let (coefficients, intercept) = match (&self.coefficients, self.intercept) {
            (Some(c), Some(b)) => (c, b),
            _ => return Err(PipelineError::NotFitted("LogisticRegression")),
        };
        if x.ncols() != coefficients.len() {
            return Err(PipelineError::ShapeMismatch {
                expected: format!("{} features", coefficients.len()),
                actual: format!("{} features", x.ncols()),
            });
        }

        let w = Array1::from(coefficients.clone());
        Ok((x.dot(&w) + intercept).mapv(Self::sigmoid))
    }

    /// Class labels at the 0.5 decision threshold.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i64>> {
        Ok(self.predict_proba(x)?.mapv(|p| i64::from(p >= 0.5)))
    }

    pub fn coefficients(&self) -> Option<&[f64]> {
        self.coefficients.as_deref()
    }

    pub fn intercept(&self) -> Option<f64> {
        self.intercept
    }

    /// Newton iterations used by the last fit.
    pub fn n_iter(&self) -> usize {
        self.n_iter
    }
}

/// Solve `a x = b` for symmetric positive-definite `a`.
///
/// Retries once with a small ridge on the diagonal when the factorization
/// hits a non-positive pivot.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    cholesky_solve_inner(a, b).or_else(|| {
        let n = a.nrows();
        let ridge = 1e-8 * (a.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64).max(1.0);
        let mut regularized = a.clone();
        for k in 0..n {
            regularized[[k, k]] += ridge;
        }
        cholesky_solve_inner(&regularized, b)
    })
}

fn cholesky_solve_inner(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 || !diag.is_finite() {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}
