//! PairLab Runner — pair run orchestration, configuration and artifacts.
//!
//! This crate builds on `pairlab-core` to provide:
//! - TOML run configuration with deterministic run ids
//! - Price loading through Yahoo, CSV or synthetic providers
//! - The hedge → stationarity → backtest pipeline
//! - JSON, CSV and Markdown artifact export

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{ConfigError, PairConfig, RunId, SourceKind};
pub use data_loader::{build_provider, load_prices, LoadError, LoadOptions, LoadedPrices};
pub use export::{
    export_json, export_series_csv, generate_report, import_json, load_artifacts,
    render_chart_svg, render_summary, save_artifacts,
};
pub use runner::{run_from_table, run_pair, PairRunResult, RunError, SCHEMA_VERSION};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn run_result_is_send_sync() {
        assert_send::<PairRunResult>();
        assert_sync::<PairRunResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<PairConfig>();
        assert_sync::<PairConfig>();
        assert_send::<LoadOptions>();
        assert_sync::<LoadOptions>();
    }

    #[test]
    fn loaded_prices_is_send_sync() {
        assert_send::<LoadedPrices>();
        assert_sync::<LoadedPrices>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
        assert_send::<LoadError>();
        assert_sync::<LoadError>();
    }
}
