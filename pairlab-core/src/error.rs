//! Error taxonomy for the analysis stages.
//!
//! Provider failures live in [`crate::data::DataError`]; everything here is
//! raised by the pure analysis core and propagates unmodified to the caller.

use thiserror::Error;

/// Errors raised by hedge estimation, stationarity testing and backtesting.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PairError {
    #[error("instrument '{symbol}' not found in price table")]
    MissingInstrument { symbol: String },

    #[error("degenerate regression: {0}")]
    DegenerateRegression(String),

    #[error("insufficient data: {required} observations required, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("series too short: {required} observations required after alignment, got {actual}")]
    EmptySeries { required: usize, actual: usize },

    #[error("invalid configuration for '{field}': {reason}")]
    InvalidConfiguration { field: String, reason: String },
}

pub type PairResult<T> = Result<T, PairError>;

impl PairError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        PairError::InvalidConfiguration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
