//! Synthetic price generation.
//!
//! Deterministic, seeded series for offline runs and tests. Output from the
//! `SyntheticProvider` is tagged `DataSource::Synthetic` so reports can flag it.

use super::provider::{DataError, DataSource, FetchResult, PriceProvider, RawQuote};
use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Random walk `x_t = x_{t-1} + step_std * e_t` starting at `start`.
pub fn random_walk(n: usize, start: f64, step_std: f64, rng: &mut StdRng) -> Vec<f64> {
    let mut out = Vec::with_capacity(n);
    let mut level = start;
    for i in 0..n {
        if i > 0 {
            let e: f64 = rng.sample(StandardNormal);
            level += step_std * e;
        }
        out.push(level);
    }
    out
}

/// AR(1) process `x_t = phi * x_{t-1} + noise_std * e_t` starting at zero.
pub fn ar1(n: usize, phi: f64, noise_std: f64, rng: &mut StdRng) -> Vec<f64> {
    let mut out = Vec::with_capacity(n);
    let mut x = 0.0;
    for _ in 0..n {
        let e: f64 = rng.sample(StandardNormal);
        x = phi * x + noise_std * e;
        out.push(x);
    }
    out
}

/// Cointegrated pair: `a` is a random walk, `b = a + N(0, noise_std)`.
pub fn cointegrated_pair(n: usize, noise_std: f64, seed: u64) -> (Vec<f64>, Vec<f64>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let a = random_walk(n, 100.0, 1.0, &mut rng);
    let b = a
        .iter()
        .map(|x| {
            let e: f64 = rng.sample(StandardNormal);
            x + noise_std * e
        })
        .collect();
    (a, b)
}

/// Weekdays in `[start, end]`.
pub fn business_days(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect()
}

/// Offline provider producing a cointegrated pair for two designated symbols.
///
/// `leg_a` is a random walk around 100; `leg_b` tracks `hedge * leg_a` plus
/// Gaussian noise. Any other symbol gets an independent random walk seeded by
/// its name, so unrelated symbols are not cointegrated.
#[derive(Debug, Clone)]
pub struct SyntheticProvider {
    leg_a: String,
    leg_b: String,
    seed: u64,
    hedge: f64,
    noise_std: f64,
}

impl SyntheticProvider {
    pub fn new(leg_a: impl Into<String>, leg_b: impl Into<String>, seed: u64) -> Self {
        Self {
            leg_a: leg_a.into(),
            leg_b: leg_b.into(),
            seed,
            hedge: 1.0,
            noise_std: 0.5,
        }
    }

    pub fn with_hedge(mut self, hedge: f64) -> Self {
        self.hedge = hedge;
        self
    }

    pub fn with_noise(mut self, noise_std: f64) -> Self {
        self.noise_std = noise_std;
        self
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(symbol.as_bytes());
        let bytes = hasher.finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&bytes.as_bytes()[..8]);
        u64::from_le_bytes(head)
    }

    fn series(&self, symbol: &str, n: usize) -> Vec<f64> {
        if symbol == self.leg_a || symbol == self.leg_b {
            let mut rng = StdRng::seed_from_u64(self.seed);
            let a = random_walk(n, 100.0, 1.0, &mut rng);
            if symbol == self.leg_a {
                return a;
            }
            return a
                .iter()
                .map(|x| {
                    let e: f64 = rng.sample(StandardNormal);
                    x / self.hedge + self.noise_std * e
                })
                .collect();
        }
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));
        random_walk(n, 100.0, 1.0, &mut rng)
    }
}

impl PriceProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        if end < start {
            return Err(DataError::Other(format!(
                "end date {end} is before start date {start}"
            )));
        }
        let dates = business_days(start, end);
        let prices = self.series(symbol, dates.len());
        let quotes = dates
            .into_iter()
            .zip(prices)
            .map(|(date, p)| RawQuote::new(date, p))
            .collect();

        Ok(FetchResult {
            symbol: symbol.to_string(),
            quotes,
            source: DataSource::Synthetic,
        })
    }
}
