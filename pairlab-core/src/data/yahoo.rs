//! Yahoo Finance price provider.
//!
//! Fetches daily closes from Yahoo's v8 chart API with a bounded retry
//! policy (exponential backoff), a per-request timeout and the shared circuit
//! breaker. Adjusted close is preferred; raw close is the fallback when the
//! adjusted series is absent.
//!
//! Yahoo has no official API and changes its response format without notice.
//! The CSV provider is the offline fallback.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataSource, FetchResult, PriceProvider, RawQuote};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Retry and timeout settings for HTTP providers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based): base * 2^(attempt-1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt - 1))
    }
}

/// Yahoo Finance provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>, policy: RetryPolicy) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(policy.timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            policy,
        })
    }

    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive on Yahoo's side; extend to the end of `end`.
        let end_ts = (end + chrono::Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d\
             &includeAdjustedClose=true"
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<RawQuote>, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => {
                DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
            }
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::ResponseFormatChanged("no timestamps".into()))?;

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut quotes = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let close = quote.close.get(i).copied().flatten();
            let adj_close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten());

            // Holidays come back as all-null rows
            if close.is_none() && adj_close.is_none() {
                continue;
            }

            quotes.push(RawQuote {
                date,
                close: close.unwrap_or(f64::NAN),
                adj_close: adj_close.unwrap_or(f64::NAN),
            });
        }

        if quotes.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }

        Ok(quotes)
    }

    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawQuote>, DataError> {
        let url = Self::chart_url(symbol, start, end);
        with_retries(&self.policy, &self.circuit_breaker, symbol, || {
            tracing::debug!(symbol, %url, "requesting chart data");
            self.request_once(symbol, &url)
        })
    }

    fn request_once(&self, symbol: &str, url: &str) -> Attempt<Vec<RawQuote>> {
        let resp = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(e) if e.is_connect() || e.is_timeout() => {
                return Attempt::Transient(DataError::NetworkUnreachable(e.to_string()))
            }
            Err(e) => return Attempt::Done(Err(DataError::NetworkUnreachable(e.to_string()))),
        };

        let status = resp.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            self.circuit_breaker.trip();
            return Attempt::Done(Err(DataError::CircuitBreakerTripped));
        }
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Attempt::Done(Err(DataError::AuthenticationRequired(
                "Yahoo Finance requires authentication".into(),
            )));
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Attempt::Done(Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            }));
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Attempt::Transient(DataError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if !status.is_success() {
            return Attempt::Transient(DataError::Other(format!("HTTP {status} for {symbol}")));
        }

        let parsed = resp
            .json::<ChartResponse>()
            .map_err(|e| {
                DataError::ResponseFormatChanged(format!(
                    "failed to parse response for {symbol}: {e}"
                ))
            })
            .and_then(|chart| Self::parse_response(symbol, chart));
        Attempt::Done(parsed)
    }
}

/// Outcome of a single request.
enum Attempt<T> {
    /// Final answer; no further retries.
    Done(Result<T, DataError>),
    /// Worth retrying after a backoff.
    Transient(DataError),
}

/// Run `request` up to `1 + max_retries` times with exponential backoff.
///
/// One fetch counts as a single breaker failure, recorded only once every
/// retry is spent, so the breaker never cuts our own retry budget short. The
/// caller sees the last transient error rather than a tripped breaker.
fn with_retries<T>(
    policy: &RetryPolicy,
    breaker: &CircuitBreaker,
    symbol: &str,
    mut request: impl FnMut() -> Attempt<T>,
) -> Result<T, DataError> {
    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            tracing::warn!(
                symbol,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "retrying Yahoo request"
            );
            std::thread::sleep(delay);
        }

        if !breaker.is_allowed() {
            return Err(last_error.unwrap_or(DataError::CircuitBreakerTripped));
        }

        match request() {
            Attempt::Done(Ok(value)) => {
                breaker.record_success();
                return Ok(value);
            }
            Attempt::Done(Err(e)) => return Err(e),
            Attempt::Transient(e) => last_error = Some(e),
        }
    }

    breaker.record_failure();
    Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
}

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let quotes = self.fetch_with_retry(symbol, start, end)?;
        tracing::info!(symbol, rows = quotes.len(), "downloaded prices from Yahoo Finance");
        Ok(FetchResult {
            symbol: symbol.to_string(),
            quotes,
            source: DataSource::YahooFinance,
        })
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
