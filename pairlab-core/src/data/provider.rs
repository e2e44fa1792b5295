//! Price provider trait and structured error types.
//!
//! The PriceProvider trait abstracts over price sources (Yahoo Finance, CSV
//! import, synthetic generation) so the pipeline can swap implementations and
//! tests can run offline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily quote from a provider, before alignment.
///
/// `adj_close` is NaN when the source has no adjusted series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawQuote {
    pub date: NaiveDate,
    pub close: f64,
    pub adj_close: f64,
}

impl RawQuote {
    /// Quote with identical raw and adjusted close.
    pub fn new(date: NaiveDate, price: f64) -> Self {
        Self {
            date,
            close: price,
            adj_close: price,
        }
    }

    /// Adjusted close when available, raw close otherwise.
    pub fn price(&self) -> f64 {
        if self.adj_close.is_finite() {
            self.adj_close
        } else {
            self.close
        }
    }
}

/// Structured error types for price retrieval.
///
/// Displayable as-is at the CLI boundary.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    /// The symbol is absent from a price table already in hand (CSV import,
    /// aligned fetches), as opposed to a failed remote lookup.
    #[error("instrument '{symbol}' is not in the price table")]
    MissingInstrument { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("csv import error: {0}")]
    Csv(String),

    #[error("no overlapping price rows for {symbols:?} after cleaning")]
    EmptyTable { symbols: Vec<String> },

    #[error("data error: {0}")]
    Other(String),
}

impl From<csv::Error> for DataError {
    fn from(e: csv::Error) -> Self {
        DataError::Csv(e.to_string())
    }
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub quotes: Vec<RawQuote>,
    pub source: DataSource,
}

/// Where the prices came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    YahooFinance,
    CsvImport,
    Synthetic,
}

impl DataSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::Synthetic)
    }
}

/// Trait for price providers.
///
/// One blocking request per symbol. Retry, timeout and rate-limit handling
/// are the implementation's concern; callers see only the final outcome.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily quotes for a symbol over an inclusive date range.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<FetchResult, DataError>;

    /// Whether the provider will currently accept requests.
    fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn price_prefers_adjusted_close() {
        let q = RawQuote {
            date: d("2024-01-02"),
            close: 101.0,
            adj_close: 99.5,
        };
        assert_eq!(q.price(), 99.5);
    }

    #[test]
    fn price_falls_back_to_close() {
        let q = RawQuote {
            date: d("2024-01-02"),
            close: 101.0,
            adj_close: f64::NAN,
        };
        assert_eq!(q.price(), 101.0);
    }

    #[test]
    fn error_messages_name_the_symbol() {
        let e = DataError::SymbolNotFound {
            symbol: "XYZ".into(),
        };
        assert!(e.to_string().contains("XYZ"));
        let e = DataError::MissingInstrument {
            symbol: "XYZ".into(),
        };
        assert!(e.to_string().contains("XYZ"));
    }
}
