//! Price loading for the runner.
//!
//! Builds the configured provider, fetches both legs over the run's date range
//! and aligns them into a single `PriceTable`. Results built on synthetic data
//! are tagged so reports can flag them.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use pairlab_core::data::{
    build_price_table, CircuitBreaker, CsvPriceProvider, DataError, DataSource, PriceProvider,
    PriceTable, RetryPolicy, SyntheticProvider, YahooProvider,
};

use crate::config::{PairConfig, SourceKind};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("provider '{provider}' is not accepting requests")]
    ProviderUnavailable { provider: String },

    #[error("failed to fetch '{symbol}': {source}")]
    Fetch {
        symbol: String,
        #[source]
        source: DataError,
    },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

impl LoadError {
    /// The symbol, when the failure is an instrument absent from a price
    /// table already in hand.
    pub fn missing_instrument(&self) -> Option<&str> {
        match self {
            LoadError::Fetch {
                source: DataError::MissingInstrument { symbol },
                ..
            }
            | LoadError::Data(DataError::MissingInstrument { symbol }) => Some(symbol),
            _ => None,
        }
    }
}

/// Date range to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Inclusive.
    pub start: NaiveDate,
    /// Inclusive.
    pub end: NaiveDate,
}

impl LoadOptions {
    pub fn from_config(config: &PairConfig) -> Self {
        Self {
            start: config.pair.start_date,
            end: config.pair.end_date,
        }
    }
}

/// Aligned prices with provenance.
#[derive(Debug, Clone)]
pub struct LoadedPrices {
    pub table: PriceTable,
    /// Data source per symbol.
    pub sources: HashMap<String, DataSource>,
    /// BLAKE3 over the aligned table.
    pub dataset_hash: String,
    /// Whether any symbol used synthetic data.
    pub has_synthetic: bool,
}

/// Instantiate the provider named by `config.provider`.
pub fn build_provider(config: &PairConfig) -> Result<Box<dyn PriceProvider>, LoadError> {
    let p = &config.provider;
    let provider: Box<dyn PriceProvider> = match p.source {
        SourceKind::Yahoo => {
            let policy = RetryPolicy {
                max_retries: p.max_retries,
                base_delay: Duration::from_millis(p.base_delay_ms),
                timeout: Duration::from_secs(p.timeout_secs),
            };
            let breaker = Arc::new(CircuitBreaker::default_provider());
            Box::new(YahooProvider::new(breaker, policy)?)
        }
        SourceKind::Csv => {
            let path = p.csv_path.as_deref().ok_or_else(|| {
                DataError::Other("provider.csv_path is required for the csv source".into())
            })?;
            Box::new(CsvPriceProvider::from_path(path)?)
        }
        SourceKind::Synthetic => Box::new(SyntheticProvider::new(
            config.pair.asset_a.clone(),
            config.pair.asset_b.clone(),
            p.seed,
        )),
    };
    tracing::debug!(provider = provider.name(), "price provider ready");
    Ok(provider)
}

/// Fetch `symbols` from `provider` and align them.
///
/// Symbol order in the table follows `symbols`.
pub fn load_prices(
    symbols: &[&str],
    provider: &dyn PriceProvider,
    opts: &LoadOptions,
) -> Result<LoadedPrices, LoadError> {
    if !provider.is_available() {
        return Err(LoadError::ProviderUnavailable {
            provider: provider.name().to_string(),
        });
    }

    let mut fetches = Vec::with_capacity(symbols.len());
    let mut sources = HashMap::new();
    for symbol in symbols {
        let fetched = provider
            .fetch(symbol, opts.start, opts.end)
            .map_err(|source| LoadError::Fetch {
                symbol: symbol.to_string(),
                source,
            })?;
        tracing::info!(
            symbol,
            provider = provider.name(),
            quotes = fetched.quotes.len(),
            "fetched prices"
        );
        sources.insert(symbol.to_string(), fetched.source);
        fetches.push(fetched);
    }

    let table = build_price_table(&fetches, symbols)?;
    let has_synthetic = sources.values().any(DataSource::is_synthetic);
    if has_synthetic {
        tracing::warn!("using synthetic prices; results will be tagged as synthetic");
    }

    Ok(LoadedPrices {
        dataset_hash: table.dataset_hash(),
        table,
        sources,
        has_synthetic,
    })
}
