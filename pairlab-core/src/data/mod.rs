//! Price retrieval and alignment.

pub mod circuit_breaker;
pub mod csv_import;
pub mod provider;
pub mod synthetic;
pub mod table;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_import::{CsvPriceProvider, TableShape};
pub use provider::{DataError, DataSource, FetchResult, PriceProvider, RawQuote};
pub use synthetic::SyntheticProvider;
pub use table::{build_price_table, PriceSeries, PriceTable};
pub use yahoo::{RetryPolicy, YahooProvider};
