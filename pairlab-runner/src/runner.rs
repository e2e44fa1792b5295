//! Pair runner — wires together data loading, hedge fit, ADF test and backtest.
//!
//! Two entry points:
//! - `run_pair()`: fetches prices through a provider, then runs. Used by the CLI.
//! - `run_from_table()`: takes an already aligned table, no I/O.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pairlab_core::analysis::{
    correlation, estimate_hedge_ratio, half_life, run_backtest, test_stationarity,
    BacktestOutput, HedgeFit, SignalConfig, StationarityVerdict,
};
use pairlab_core::data::{PriceProvider, PriceTable};
use pairlab_core::PairError;

use crate::config::{ConfigError, PairConfig, RunId};
use crate::data_loader::{load_prices, LoadError, LoadOptions};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(LoadError),
    #[error("analysis error: {0}")]
    Analysis(#[from] PairError),
    #[error(
        "spread is not stationary (p-value {p_value:.4} >= {significance}); \
         set require_stationary = false to backtest anyway"
    )]
    NotStationary { p_value: f64, significance: f64 },
}

impl From<LoadError> for RunError {
    fn from(err: LoadError) -> Self {
        match err.missing_instrument() {
            Some(symbol) => RunError::Analysis(PairError::MissingInstrument {
                symbol: symbol.to_string(),
            }),
            None => RunError::Data(err),
        }
    }
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single pair run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairRunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    pub asset_a: String,
    pub asset_b: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub signal_config: SignalConfig,
    pub dates: Vec<NaiveDate>,
    pub price_a: Vec<f64>,
    pub price_b: Vec<f64>,
    pub hedge: HedgeFit,
    /// Pearson correlation of the two price series.
    pub correlation: Option<f64>,
    /// Spread mean-reversion half-life in trading days.
    pub half_life: Option<f64>,
    pub stationarity: StationarityVerdict,
    pub backtest: BacktestOutput,
}

impl PairRunResult {
    pub fn observations(&self) -> usize {
        self.dates.len()
    }
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Validate the config, load both legs through `provider` and run.
pub fn run_pair(config: &PairConfig, provider: &dyn PriceProvider) -> Result<PairRunResult, RunError> {
    config.validate()?;
    let symbols = [config.pair.asset_a.as_str(), config.pair.asset_b.as_str()];
    let loaded = load_prices(&symbols, provider, &LoadOptions::from_config(config))?;
    run_from_table(config, &loaded.table, &loaded.dataset_hash, loaded.has_synthetic)
}

/// Run the analysis pipeline on pre-loaded prices without I/O.
///
/// Stages run strictly in order; the first failure aborts the run.
pub fn run_from_table(
    config: &PairConfig,
    table: &PriceTable,
    dataset_hash: &str,
    has_synthetic: bool,
) -> Result<PairRunResult, RunError> {
    let (asset_a, asset_b) = (config.pair.asset_a.as_str(), config.pair.asset_b.as_str());

    let hedge = estimate_hedge_ratio(table, asset_a, asset_b)?;
    let stationarity = test_stationarity(&hedge.spread, &config.stationarity.test_config())?;
    if config.stationarity.require_stationary && !stationarity.is_stationary {
        return Err(RunError::NotStationary {
            p_value: stationarity.p_value,
            significance: stationarity.significance,
        });
    }

    let price_a = table.series(asset_a)?.values.to_vec();
    let price_b = table.series(asset_b)?.values.to_vec();
    let backtest = run_backtest(&price_a, &price_b, &hedge.spread, &config.signal)?;

    Ok(PairRunResult {
        schema_version: SCHEMA_VERSION,
        run_id: config.run_id(),
        asset_a: asset_a.to_string(),
        asset_b: asset_b.to_string(),
        start_date: config.pair.start_date,
        end_date: config.pair.end_date,
        dataset_hash: dataset_hash.to_string(),
        has_synthetic,
        signal_config: config.signal.clone(),
        dates: table.dates().to_vec(),
        correlation: correlation(&price_a, &price_b),
        half_life: half_life(&hedge.spread),
        price_a,
        price_b,
        hedge,
        stationarity,
        backtest,
    })
}
