//! Statistical core: hedge ratio, stationarity, signals and backtest.
//!
//! Every function here is pure apart from `tracing` events.

pub mod backtest;
pub mod hedge;
pub mod metrics;
pub mod regression;
pub mod signal;
pub mod stationarity;
pub mod zscore;

pub use backtest::{run_backtest, BacktestOutput};
pub use hedge::{correlation, estimate_hedge_ratio, half_life, HedgeFit};
pub use metrics::PerformanceSummary;
pub use signal::{generate_signals, Position, SignalConfig};
pub use stationarity::{
    test_stationarity, CriticalValues, LagSelection, StationarityConfig, StationarityVerdict,
};
pub use zscore::rolling_zscore;
