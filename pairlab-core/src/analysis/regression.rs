//! Least-squares helpers shared by the hedge estimator and the ADF test.

use nalgebra::{DMatrix, DVector};

/// Simple regression `y = intercept + slope * x`.
///
/// Returns `None` when `x` has zero variance or fewer than two points.
/// Variance counts as zero when the centered sum of squares is within the
/// rounding a constant column leaves after centering, `(n·ε)² Σx²`. Any
/// genuine spread, however small relative to the level, is kept.
pub fn simple_ols(y: &[f64], x: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = x[..n].iter().sum::<f64>() / nf;
    let mean_y = y[..n].iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for i in 0..n {
        let dx = x[i] - mean_x;
        sxy += dx * (y[i] - mean_y);
        sxx += dx * dx;
    }

    let scale: f64 = x[..n].iter().map(|v| v * v).sum();
    let rounding = (nf * f64::EPSILON).powi(2) * scale;
    if !sxx.is_finite() || sxx <= rounding.max(f64::MIN_POSITIVE) {
        return None;
    }

    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

/// Multiple regression fit with the statistics the ADF test needs.
#[derive(Debug, Clone)]
pub struct OlsFit {
    pub params: DVector<f64>,
    pub ssr: f64,
    pub nobs: usize,
    xtx_inv: DMatrix<f64>,
}

impl OlsFit {
    /// Fit `y = X b` by the normal equations. `None` when `X'X` is singular or
    /// there are no residual degrees of freedom.
    pub fn fit(y: &DVector<f64>, x: &DMatrix<f64>) -> Option<Self> {
        let nobs = x.nrows();
        if nobs <= x.ncols() {
            return None;
        }
        let xt = x.transpose();
        let xtx_inv = (&xt * x).try_inverse()?;
        let params = &xtx_inv * (&xt * y);
        let resid = y - x * &params;
        let ssr = resid.dot(&resid);
        if !ssr.is_finite() {
            return None;
        }
        Some(Self {
            params,
            ssr,
            nobs,
            xtx_inv,
        })
    }

    pub fn k(&self) -> usize {
        self.params.len()
    }

    /// t statistic of coefficient `i`.
    pub fn t_value(&self, i: usize) -> f64 {
        let dof = (self.nobs - self.k()) as f64;
        let sigma2 = self.ssr / dof;
        let se = (sigma2 * self.xtx_inv[(i, i)]).sqrt();
        self.params[i] / se
    }

    /// Gaussian log-likelihood at the fitted parameters.
    pub fn log_likelihood(&self) -> f64 {
        let n = self.nobs as f64;
        -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0)
    }

    pub fn aic(&self) -> f64 {
        -2.0 * self.log_likelihood() + 2.0 * self.k() as f64
    }

    pub fn bic(&self) -> f64 {
        -2.0 * self.log_likelihood() + (self.nobs as f64).ln() * self.k() as f64
    }
}
