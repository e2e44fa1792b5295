//! Performance metrics — pure functions over daily strategy returns.
//!
//! Returns in, scalar out. Annualization assumes 252 trading days.

use serde::{Deserialize, Serialize};

use super::signal::{position_changes, Position};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Summary statistics of a backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub sharpe_ratio: f64,
    pub total_return_pct: f64,
    pub annualized_volatility: f64,
    /// Largest peak-to-trough fall of the cumulative curve, as a negative fraction.
    pub max_drawdown: f64,
    pub position_changes: usize,
    pub days_in_market: usize,
    pub observations: usize,
}

impl PerformanceSummary {
    pub fn compute(strategy_returns: &[f64], cumulative: &[f64], signals: &[Position]) -> Self {
        Self {
            sharpe_ratio: sharpe_ratio(strategy_returns),
            total_return_pct: total_return_pct(cumulative),
            annualized_volatility: annualized_volatility(strategy_returns),
            max_drawdown: max_drawdown(cumulative),
            position_changes: position_changes(signals),
            days_in_market: signals.iter().filter(|p| !p.is_flat()).count(),
            observations: strategy_returns.len(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Annualized Sharpe ratio: mean / std (ddof = 1) × √252.
///
/// Exactly 0.0 when every return is identical, the deviation is zero, or there
/// are fewer than 2 returns.
pub fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let first = returns[0];
    if returns.iter().all(|r| *r == first) {
        return 0.0;
    }
    let std = std_dev(returns);
    if std == 0.0 || !std.is_finite() {
        return 0.0;
    }
    mean_f64(returns) / std * TRADING_DAYS_PER_YEAR.sqrt()
}

/// `(last − 1) × 100` for a cumulative curve starting at 1.
pub fn total_return_pct(cumulative: &[f64]) -> f64 {
    match cumulative.last() {
        Some(last) => (last - 1.0) * 100.0,
        None => 0.0,
    }
}

/// Sample standard deviation of daily returns × √252.
pub fn annualized_volatility(returns: &[f64]) -> f64 {
    std_dev(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

/// Maximum drawdown as a negative fraction (e.g., -0.15 = 15% drawdown).
///
/// Returns 0.0 if the curve is constant or monotonically increasing.
pub fn max_drawdown(curve: &[f64]) -> f64 {
    if curve.len() < 2 {
        return 0.0;
    }
    let mut peak = curve[0];
    let mut max_dd = 0.0_f64;

    for &v in curve {
        if v > peak {
            peak = v;
        }
        if peak > 0.0 {
            let dd = (v - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }
    max_dd
}

// ─── Helpers ────────────────────────────────────────────────────────

pub fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}
