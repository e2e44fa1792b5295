//! Vectorized pairs backtest.
//!
//! Positions are decided on the close of day `t-1` and earn the return
//! differential of the two legs on day `t`:
//!
//! ```text
//! strategy_return[t] = position[t-1] * (ret_A[t] - ret_B[t])
//! ```
//!
//! The first day earns nothing. Cumulative return compounds from 1.0.

use serde::{Deserialize, Serialize};

use super::metrics::PerformanceSummary;
use super::signal::{generate_signals, Position, SignalConfig};
use super::zscore::rolling_zscore;
use crate::error::{PairError, PairResult};

/// Every per-day series of a backtest plus its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestOutput {
    pub zscores: Vec<Option<f64>>,
    pub signals: Vec<Position>,
    pub strategy_returns: Vec<f64>,
    pub cumulative_returns: Vec<f64>,
    pub summary: PerformanceSummary,
}

impl BacktestOutput {
    pub fn len(&self) -> usize {
        self.strategy_returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategy_returns.is_empty()
    }
}

/// Run the z-score strategy over aligned prices and their spread.
pub fn run_backtest(
    price_a: &[f64],
    price_b: &[f64],
    spread: &[f64],
    config: &SignalConfig,
) -> PairResult<BacktestOutput> {
    config.validate()?;

    let n = spread.len();
    if price_a.len() != n || price_b.len() != n {
        return Err(PairError::invalid(
            "prices",
            format!(
                "series lengths differ (A: {}, B: {}, spread: {n})",
                price_a.len(),
                price_b.len()
            ),
        ));
    }
    let required = config.window + 1;
    if n < required {
        return Err(PairError::EmptySeries {
            required,
            actual: n,
        });
    }

    let zscores = rolling_zscore(spread, config.window);
    let signals = generate_signals(&zscores, config);
    let strategy_returns = strategy_returns(
        &signals,
        &simple_returns(price_a),
        &simple_returns(price_b),
    );
    let cumulative_returns = cumulative_returns(&strategy_returns);
    let summary = PerformanceSummary::compute(&strategy_returns, &cumulative_returns, &signals);

    tracing::info!(
        sharpe = summary.sharpe_ratio,
        total_return_pct = summary.total_return_pct,
        max_drawdown = summary.max_drawdown,
        position_changes = summary.position_changes,
        days = n,
        "backtest complete"
    );

    Ok(BacktestOutput {
        zscores,
        signals,
        strategy_returns,
        cumulative_returns,
        summary,
    })
}

/// Day-over-day simple returns, 0 on the first day and after a zero price.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(prices.len());
    if prices.is_empty() {
        return out;
    }
    out.push(0.0);
    out.extend(prices.windows(2).map(|w| {
        if w[0] != 0.0 {
            w[1] / w[0] - 1.0
        } else {
            0.0
        }
    }));
    out
}

/// Yesterday's position times today's return differential.
pub fn strategy_returns(signals: &[Position], returns_a: &[f64], returns_b: &[f64]) -> Vec<f64> {
    let n = signals.len().min(returns_a.len()).min(returns_b.len());
    (0..n)
        .map(|t| {
            if t == 0 {
                0.0
            } else {
                signals[t - 1].as_f64() * (returns_a[t] - returns_b[t])
            }
        })
        .collect()
}

/// Running product of `1 + r`.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}
