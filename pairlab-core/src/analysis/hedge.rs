//! Hedge ratio estimation.
//!
//! Regress leg A on leg B by ordinary least squares:
//!
//! ```text
//! price_A = intercept + hedge_ratio * price_B + noise
//! ```
//!
//! The spread is then rebuilt from raw prices as `price_A - hedge_ratio * price_B`.
//! The intercept is kept on the fit for diagnostics only, so the spread is not
//! zero-mean.

use serde::{Deserialize, Serialize};

use super::regression::simple_ols;
use crate::data::PriceTable;
use crate::error::{PairError, PairResult};

/// Result of regressing leg A on leg B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeFit {
    pub asset_a: String,
    pub asset_b: String,
    pub hedge_ratio: f64,
    pub intercept: f64,
    /// `price_A - hedge_ratio * price_B`, one value per table date.
    pub spread: Vec<f64>,
}

impl HedgeFit {
    /// Recompute the spread for arbitrary prices with this fit's ratio.
    pub fn spread_of(&self, price_a: &[f64], price_b: &[f64]) -> Vec<f64> {
        compute_spread(price_a, price_b, self.hedge_ratio)
    }
}

/// Estimate the hedge ratio of `asset_a` on `asset_b` from an aligned table.
pub fn estimate_hedge_ratio(
    table: &PriceTable,
    asset_a: &str,
    asset_b: &str,
) -> PairResult<HedgeFit> {
    let a = table.series(asset_a)?;
    let b = table.series(asset_b)?;

    let (hedge_ratio, intercept) = fit_hedge_ratio(a.values, b.values)?;
    let spread = compute_spread(a.values, b.values, hedge_ratio);

    tracing::info!(
        asset_a,
        asset_b,
        hedge_ratio,
        intercept,
        observations = spread.len(),
        "estimated hedge ratio"
    );

    Ok(HedgeFit {
        asset_a: asset_a.to_string(),
        asset_b: asset_b.to_string(),
        hedge_ratio,
        intercept,
        spread,
    })
}

/// OLS slope and intercept of `price_a` on `price_b`.
pub fn fit_hedge_ratio(price_a: &[f64], price_b: &[f64]) -> PairResult<(f64, f64)> {
    if price_a.len() != price_b.len() {
        return Err(PairError::DegenerateRegression(format!(
            "series lengths differ ({} vs {})",
            price_a.len(),
            price_b.len()
        )));
    }
    simple_ols(price_a, price_b).ok_or_else(|| {
        PairError::DegenerateRegression(
            "independent series has zero variance; hedge ratio is undefined".into(),
        )
    })
}

pub fn compute_spread(price_a: &[f64], price_b: &[f64], hedge_ratio: f64) -> Vec<f64> {
    price_a
        .iter()
        .zip(price_b)
        .map(|(a, b)| a - hedge_ratio * b)
        .collect()
}

/// Pearson correlation of two equal-length series.
pub fn correlation(x: &[f64], y: &[f64]) -> Option<f64> {
    let n = x.len();
    if n < 2 || y.len() != n {
        return None;
    }
    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;
    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    let denom = (var_x * var_y).sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return None;
    }
    Some(cov / denom)
}

/// Mean-reversion half-life in periods.
///
/// Fits `Δs_t = c + λ s_{t-1}` and returns `-ln 2 / λ`. `None` when the spread
/// does not revert (λ ≥ 0) or the fit is undefined.
pub fn half_life(spread: &[f64]) -> Option<f64> {
    if spread.len() < 3 {
        return None;
    }
    let lagged = &spread[..spread.len() - 1];
    let delta: Vec<f64> = spread.windows(2).map(|w| w[1] - w[0]).collect();
    let (lambda, _) = simple_ols(&delta, lagged)?;
    if lambda >= 0.0 {
        return None;
    }
    Some(-std::f64::consts::LN_2 / lambda)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{ar1, cointegrated_pair};
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn table(a: Vec<f64>, b: Vec<f64>) -> PriceTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dates = (0..a.len())
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect();
        PriceTable::from_columns(dates, vec![("A".into(), a), ("B".into(), b)]).unwrap()
    }

    #[test]
    fn exact_linear_relation_recovers_ratio() {
        let b: Vec<f64> = (0..50).map(|i| 20.0 + i as f64 * 0.7).collect();
        let a: Vec<f64> = b.iter().map(|x| 5.0 + 1.8 * x).collect();
        let fit = estimate_hedge_ratio(&table(a, b), "A", "B").unwrap();
        assert!((fit.hedge_ratio - 1.8).abs() < 1e-10);
        assert!((fit.intercept - 5.0).abs() < 1e-8);
        // intercept is not subtracted: spread sits at ~5.0
        assert!(fit.spread.iter().all(|s| (s - 5.0).abs() < 1e-8));
    }

    #[test]
    fn spread_round_trip_is_exact() {
        let (a, b) = cointegrated_pair(200, 0.3, 9);
        let fit = estimate_hedge_ratio(&table(a.clone(), b.clone()), "A", "B").unwrap();
        assert!(fit.hedge_ratio.is_finite());
        let direct: Vec<f64> = a
            .iter()
            .zip(&b)
            .map(|(x, y)| x - fit.hedge_ratio * y)
            .collect();
        assert_eq!(fit.spread, direct);
        assert_eq!(fit.spread_of(&a, &b), direct);
    }

    #[test]
    fn missing_leg_is_reported() {
        let t = table(vec![1.0, 2.0, 3.0], vec![2.0, 3.0, 5.0]);
        assert_eq!(
            estimate_hedge_ratio(&t, "A", "ZZZ").unwrap_err(),
            PairError::MissingInstrument {
                symbol: "ZZZ".into()
            }
        );
        assert!(matches!(
            estimate_hedge_ratio(&t, "QQQ", "B"),
            Err(PairError::MissingInstrument { .. })
        ));
    }

    #[test]
    fn constant_independent_leg_is_degenerate() {
        let t = table(vec![1.0, 2.0, 3.0, 4.0], vec![7.0; 4]);
        assert!(matches!(
            estimate_hedge_ratio(&t, "A", "B"),
            Err(PairError::DegenerateRegression(_))
        ));
    }

    #[test]
    fn correlation_of_identical_series_is_one() {
        let x = [1.0, 3.0, 2.0, 5.0];
        assert!((correlation(&x, &x).unwrap() - 1.0).abs() < 1e-12);
        assert!(correlation(&x, &[1.0, 1.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn half_life_of_ar1_matches_theory() {
        // phi = 0.5 ⇒ λ = -0.5 ⇒ half-life = ln2 / 0.5 ≈ 1.39
        let mut rng = StdRng::seed_from_u64(21);
        let s = ar1(5_000, 0.5, 1.0, &mut rng);
        let hl = half_life(&s).unwrap();
        assert!((hl - 1.386).abs() < 0.2, "half-life {hl}");
    }

    #[test]
    fn half_life_of_trend_is_none() {
        let s: Vec<f64> = (0..20).map(|i| (i * i) as f64).collect();
        assert!(half_life(&s).is_none());
    }
}
