//! Augmented Dickey-Fuller test on the spread.
//!
//! The regression includes a constant and `p` lagged differences:
//!
//! ```text
//! Δx_t = α + γ x_{t-1} + Σ_{i=1..p} β_i Δx_{t-i} + ε_t
//! ```
//!
//! The test statistic is the t-value of `γ`. By default `p` is chosen by AIC
//! over `0..=maxlag` on a common sample, with `maxlag = ceil(12 (n/100)^¼)`
//! capped at `n/2 - 2`, and the chosen lag is re-fitted on the largest sample
//! it allows. p-values follow MacKinnon's (1994) response surface and the
//! critical values MacKinnon (2010), both for the constant-only case with a
//! single series.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

use super::regression::OlsFit;
use crate::error::{PairError, PairResult};

// ─── Configuration ──────────────────────────────────────────────────

/// How the number of lagged differences is picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LagSelection {
    /// Minimum Akaike information criterion.
    Aic,
    /// Minimum Bayesian information criterion.
    Bic,
    /// Exactly this many lags.
    Fixed(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationarityConfig {
    /// Reject the unit root when `p_value < significance`.
    pub significance: f64,
    pub min_observations: usize,
    pub lag_selection: LagSelection,
}

impl Default for StationarityConfig {
    fn default() -> Self {
        Self {
            significance: 0.05,
            min_observations: 20,
            lag_selection: LagSelection::Aic,
        }
    }
}

impl StationarityConfig {
    pub fn validate(&self) -> PairResult<()> {
        if !self.significance.is_finite() || self.significance <= 0.0 || self.significance >= 1.0
        {
            return Err(PairError::invalid(
                "significance",
                format!("must lie in (0, 1), got {}", self.significance),
            ));
        }
        Ok(())
    }
}

// ─── Verdict ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationarityVerdict {
    pub statistic: f64,
    pub p_value: f64,
    pub used_lag: usize,
    /// Observations in the final regression.
    pub n_obs: usize,
    pub critical_values: CriticalValues,
    pub significance: f64,
    pub is_stationary: bool,
}

// ─── Test ───────────────────────────────────────────────────────────

/// Run the ADF test on `spread`.
///
/// Fails with `InsufficientData` when the series is shorter than
/// `config.min_observations` or too short for any lag, and with
/// `DegenerateRegression` when the regression is singular (e.g. a constant
/// spread).
pub fn test_stationarity(
    spread: &[f64],
    config: &StationarityConfig,
) -> PairResult<StationarityVerdict> {
    config.validate()?;
    let n = spread.len();
    if n < config.min_observations {
        return Err(PairError::InsufficientData {
            required: config.min_observations,
            actual: n,
        });
    }

    let cap = max_lag_cap(n).ok_or(PairError::InsufficientData {
        required: 4,
        actual: n,
    })?;

    let diffs: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();

    let max_lag = default_max_lag(n).min(cap);
    let used_lag = match config.lag_selection {
        LagSelection::Fixed(k) => {
            if k > cap {
                return Err(PairError::InsufficientData {
                    required: 2 * k + 4,
                    actual: n,
                });
            }
            k
        }
        LagSelection::Aic => select_lag(spread, &diffs, max_lag, Criterion::Aic)?,
        LagSelection::Bic => select_lag(spread, &diffs, max_lag, Criterion::Bic)?,
    };

    let (y, x) = design(spread, &diffs, used_lag, used_lag);
    let fit = OlsFit::fit(&y, &x).ok_or_else(singular)?;
    let statistic = fit.t_value(1);
    if !statistic.is_finite() || fit.ssr <= f64::EPSILON * y.dot(&y) {
        return Err(PairError::DegenerateRegression(
            "ADF regression fits the spread exactly; no residual variance".into(),
        ));
    }

    let n_obs = fit.nobs;
    let p_value = mackinnon_p(statistic);
    let verdict = StationarityVerdict {
        statistic,
        p_value,
        used_lag,
        n_obs,
        critical_values: critical_values(n_obs),
        significance: config.significance,
        is_stationary: p_value < config.significance,
    };

    if verdict.is_stationary {
        tracing::info!(
            statistic,
            p_value,
            used_lag,
            n_obs,
            "spread is stationary (unit root rejected)"
        );
    } else {
        tracing::warn!(
            statistic,
            p_value,
            used_lag,
            significance = config.significance,
            "spread is not stationary; pair may not be cointegrated"
        );
    }
    Ok(verdict)
}

/// Schwert's rule of thumb, `ceil(12 (n/100)^¼)`.
pub fn default_max_lag(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// Largest lag leaving enough observations for the constant-only regression.
fn max_lag_cap(n: usize) -> Option<usize> {
    (n / 2).checked_sub(2)
}

#[derive(Debug, Clone, Copy)]
enum Criterion {
    Aic,
    Bic,
}

/// Minimum-criterion lag over `0..=max_lag`, every candidate fitted on the
/// sample that `max_lag` allows. Ties keep the smaller lag.
fn select_lag(
    levels: &[f64],
    diffs: &[f64],
    max_lag: usize,
    criterion: Criterion,
) -> PairResult<usize> {
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=max_lag {
        let (y, x) = design(levels, diffs, max_lag, lag);
        let Some(fit) = OlsFit::fit(&y, &x) else {
            continue;
        };
        let ic = match criterion {
            Criterion::Aic => fit.aic(),
            Criterion::Bic => fit.bic(),
        };
        if ic.is_nan() {
            continue;
        }
        if best.map_or(true, |(b, _)| ic < b) {
            best = Some((ic, lag));
        }
    }
    let (_, lag) = best.ok_or_else(singular)?;
    tracing::debug!(lag, max_lag, ?criterion, "selected ADF lag");
    Ok(lag)
}

/// Regression rows for the ADF equation.
///
/// Rows run over `j = start..diffs.len()`, regressing `Δx_j` on
/// `[1, x_j, Δx_{j-1}, …, Δx_{j-lag}]`. `start` must be at least `lag`.
fn design(
    levels: &[f64],
    diffs: &[f64],
    start: usize,
    lag: usize,
) -> (DVector<f64>, DMatrix<f64>) {
    let rows = diffs.len() - start;
    let cols = lag + 2;
    let y = DVector::from_iterator(rows, diffs[start..].iter().copied());
    let x = DMatrix::from_fn(rows, cols, |r, c| {
        let j = start + r;
        match c {
            0 => 1.0,
            1 => levels[j],
            _ => diffs[j - (c - 1)],
        }
    });
    (y, x)
}

fn singular() -> PairError {
    PairError::DegenerateRegression("ADF regression is singular; spread may be constant".into())
}

// ─── MacKinnon tables (constant, one series) ────────────────────────

const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

const CRIT_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Approximate p-value of an ADF statistic.
pub fn mackinnon_p(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coef: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    standard_normal_cdf(polyval(coef, statistic))
}

/// Finite-sample critical values for `n_obs` observations.
pub fn critical_values(n_obs: usize) -> CriticalValues {
    let inv = 1.0 / n_obs.max(1) as f64;
    CriticalValues {
        one_pct: polyval(&CRIT_1, inv),
        five_pct: polyval(&CRIT_5, inv),
        ten_pct: polyval(&CRIT_10, inv),
    }
}

/// `c[0] + c[1] x + c[2] x² + …`
fn polyval(coef: &[f64], x: f64) -> f64 {
    coef.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn standard_normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{ar1, random_walk};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn p_value_at_asymptotic_critical_values() {
        assert!((mackinnon_p(-2.86154) - 0.05).abs() < 0.005);
        assert!((mackinnon_p(-3.43035) - 0.01).abs() < 0.002);
    }

    #[test]
    fn p_value_clamps_and_is_monotone() {
        assert_eq!(mackinnon_p(3.0), 1.0);
        assert_eq!(mackinnon_p(-25.0), 0.0);
        let mut prev = 0.0;
        for i in -180..27 {
            let p = mackinnon_p(i as f64 / 10.0);
            assert!(p >= prev - 1e-3, "p-value dropped at {}", i as f64 / 10.0);
            prev = p;
        }
    }

    #[test]
    fn critical_values_are_ordered_and_near_asymptote() {
        let cv = critical_values(500);
        assert!(cv.one_pct < cv.five_pct && cv.five_pct < cv.ten_pct);
        assert!((cv.five_pct - (-2.8673)).abs() < 1e-3);
    }

    #[test]
    fn default_max_lag_follows_schwert() {
        assert_eq!(default_max_lag(100), 12);
        assert_eq!(default_max_lag(500), 18);
        assert_eq!(default_max_lag(20), 9);
    }

    #[test]
    fn design_rows_line_up() {
        let levels = [1.0, 3.0, 2.0, 5.0, 4.0];
        let diffs: Vec<f64> = levels.windows(2).map(|w| w[1] - w[0]).collect();
        // diffs = [2, -1, 3, -1]
        let (y, x) = design(&levels, &diffs, 1, 1);
        assert_eq!(y.as_slice(), &[-1.0, 3.0, -1.0]);
        assert_eq!(x.row(0).iter().copied().collect::<Vec<_>>(), vec![1.0, 3.0, 2.0]);
        assert_eq!(x.row(2).iter().copied().collect::<Vec<_>>(), vec![1.0, 5.0, 3.0]);
    }

    #[test]
    fn ar1_is_stationary() {
        let mut rng = StdRng::seed_from_u64(42);
        let s = ar1(500, 0.5, 1.0, &mut rng);
        let v = test_stationarity(&s, &StationarityConfig::default()).unwrap();
        assert!(v.is_stationary, "{v:?}");
        assert!(v.statistic < v.critical_values.one_pct);
        assert!(v.used_lag <= default_max_lag(500));
        assert_eq!(v.n_obs, 500 - 1 - v.used_lag);
    }

    #[test]
    fn random_walk_is_usually_not_stationary() {
        let rejected = (0..20u64)
            .filter(|seed| {
                let mut rng = StdRng::seed_from_u64(1_000 + seed);
                let s = random_walk(500, 100.0, 1.0, &mut rng);
                test_stationarity(&s, &StationarityConfig::default())
                    .unwrap()
                    .is_stationary
            })
            .count();
        assert!(rejected <= 5, "{rejected} of 20 random walks looked stationary");
    }

    #[test]
    fn short_series_is_insufficient() {
        let err = test_stationarity(&[1.0, 2.0, 1.5], &StationarityConfig::default()).unwrap_err();
        assert_eq!(
            err,
            PairError::InsufficientData {
                required: 20,
                actual: 3
            }
        );
    }

    #[test]
    fn fixed_lag_beyond_cap_is_insufficient() {
        let mut rng = StdRng::seed_from_u64(3);
        let s = ar1(30, 0.5, 1.0, &mut rng);
        let cfg = StationarityConfig {
            lag_selection: LagSelection::Fixed(20),
            ..Default::default()
        };
        assert!(matches!(
            test_stationarity(&s, &cfg),
            Err(PairError::InsufficientData { .. })
        ));

        let cfg = StationarityConfig {
            lag_selection: LagSelection::Fixed(2),
            ..Default::default()
        };
        let v = test_stationarity(&s, &cfg).unwrap();
        assert_eq!(v.used_lag, 2);
        assert_eq!(v.n_obs, 30 - 1 - 2);
    }

    #[test]
    fn constant_spread_is_degenerate() {
        let s = vec![3.0; 50];
        assert!(matches!(
            test_stationarity(&s, &StationarityConfig::default()),
            Err(PairError::DegenerateRegression(_))
        ));
    }

    #[test]
    fn perfectly_alternating_spread_is_degenerate() {
        let s: Vec<f64> = (0..60).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let cfg = StationarityConfig {
            lag_selection: LagSelection::Fixed(0),
            ..Default::default()
        };
        assert!(matches!(
            test_stationarity(&s, &cfg),
            Err(PairError::DegenerateRegression(_))
        ));
    }

    #[test]
    fn invalid_significance_is_rejected() {
        let cfg = StationarityConfig {
            significance: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            test_stationarity(&[0.0; 30], &cfg),
            Err(PairError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn lag_selection_parses_from_toml_shapes() {
        #[derive(Deserialize)]
        struct Wrap {
            lag_selection: LagSelection,
        }
        let w: Wrap = serde_json::from_str(r#"{"lag_selection":"bic"}"#).unwrap();
        assert_eq!(w.lag_selection, LagSelection::Bic);
        let w: Wrap = serde_json::from_str(r#"{"lag_selection":{"fixed":3}}"#).unwrap();
        assert_eq!(w.lag_selection, LagSelection::Fixed(3));
    }
}
