//! PairLab Core — price data, hedge ratio, stationarity test, z-score backtest.
//!
//! This crate contains the statistical pipeline for a two-asset pair:
//! - Price providers (Yahoo, CSV, synthetic) and the aligned price table
//! - OLS hedge ratio and spread construction
//! - Augmented Dickey-Fuller stationarity test with MacKinnon p-values
//! - Rolling z-score band signals and a vectorized backtest
//! - Performance metrics over daily strategy returns

pub mod analysis;
pub mod data;
pub mod error;

pub use error::{PairError, PairResult};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: results and providers can cross thread boundaries.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Data types
        require_send::<data::PriceTable>();
        require_sync::<data::PriceTable>();
        require_send::<data::FetchResult>();
        require_sync::<data::FetchResult>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();

        // Providers
        require_send::<data::YahooProvider>();
        require_sync::<data::YahooProvider>();
        require_send::<data::CsvPriceProvider>();
        require_sync::<data::CsvPriceProvider>();
        require_send::<data::SyntheticProvider>();
        require_sync::<data::SyntheticProvider>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();

        // Analysis results
        require_send::<analysis::HedgeFit>();
        require_sync::<analysis::HedgeFit>();
        require_send::<analysis::StationarityVerdict>();
        require_sync::<analysis::StationarityVerdict>();
        require_send::<analysis::BacktestOutput>();
        require_sync::<analysis::BacktestOutput>();
        require_send::<PairError>();
        require_sync::<PairError>();
    }

    /// Architecture contract: analysis stages take borrowed slices and never
    /// see a provider.
    #[test]
    fn backtest_signature_is_provider_free() {
        fn _check(
            a: &[f64],
            b: &[f64],
            spread: &[f64],
            cfg: &analysis::SignalConfig,
        ) -> PairResult<analysis::BacktestOutput> {
            analysis::run_backtest(a, b, spread, cfg)
        }
    }
}
