//! Aligned price table.
//!
//! Given quotes for several symbols, build a single table on the common
//! timeline: duplicate dates collapse to the last quote, non-finite prices are
//! dropped, and only dates where every symbol has a price survive (inner join).
//! Downstream stages can then index all columns with the same position.

use super::provider::{DataError, FetchResult, RawQuote};
use crate::error::{PairError, PairResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One price per symbol per trading date, gap-free.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    symbols: Vec<String>,
    columns: HashMap<String, Vec<f64>>,
}

/// Borrowed view of one aligned column.
#[derive(Debug, Clone, Copy)]
pub struct PriceSeries<'a> {
    pub symbol: &'a str,
    pub dates: &'a [NaiveDate],
    pub values: &'a [f64],
}

impl<'a> PriceSeries<'a> {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl PriceTable {
    /// Build a table from per-symbol price columns already on a shared index.
    ///
    /// Every column must have the same length as `dates`; used by tests and the
    /// in-memory entry points.
    pub fn from_columns(
        dates: Vec<NaiveDate>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> PairResult<Self> {
        let mut map = HashMap::new();
        let mut symbols = Vec::new();
        for (symbol, values) in columns {
            if values.len() != dates.len() {
                return Err(PairError::invalid(
                    &symbol,
                    format!(
                        "column has {} values but the index has {} dates",
                        values.len(),
                        dates.len()
                    ),
                ));
            }
            symbols.push(symbol.clone());
            map.insert(symbol, values);
        }
        Ok(Self {
            dates,
            symbols,
            columns: map,
        })
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.columns.contains_key(symbol)
    }

    /// Column view for `symbol`, or `MissingInstrument`.
    pub fn series(&self, symbol: &str) -> PairResult<PriceSeries<'_>> {
        let (symbol, values) =
            self.columns
                .get_key_value(symbol)
                .ok_or_else(|| PairError::MissingInstrument {
                    symbol: symbol.to_string(),
                })?;
        Ok(PriceSeries {
            symbol,
            dates: &self.dates,
            values,
        })
    }

    /// First `n` rows as `(date, prices in symbol order)`.
    pub fn head(&self, n: usize) -> Vec<(NaiveDate, Vec<f64>)> {
        self.dates
            .iter()
            .enumerate()
            .take(n)
            .map(|(i, date)| {
                let row = self.symbols.iter().map(|s| self.columns[s][i]).collect();
                (*date, row)
            })
            .collect()
    }

    /// Deterministic BLAKE3 hash over dates and prices in symbol order.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        let mut symbols: Vec<&String> = self.symbols.iter().collect();
        symbols.sort();
        for date in &self.dates {
            hasher.update(date.to_string().as_bytes());
        }
        for symbol in symbols {
            hasher.update(symbol.as_bytes());
            for v in &self.columns[symbol] {
                hasher.update(&v.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Align fetched quotes for `symbols` into a gap-free table.
///
/// Symbol order in the table follows `symbols`. Fails with `EmptyTable` when
/// no date survives cleaning.
pub fn build_price_table(
    fetches: &[FetchResult],
    symbols: &[&str],
) -> Result<PriceTable, DataError> {
    let mut per_symbol: Vec<(String, BTreeMap<NaiveDate, f64>)> = Vec::new();

    for symbol in symbols {
        let fetch = fetches
            .iter()
            .find(|f| f.symbol == *symbol)
            .ok_or_else(|| DataError::MissingInstrument {
                symbol: symbol.to_string(),
            })?;
        per_symbol.push((symbol.to_string(), clean_quotes(&fetch.quotes)));
    }

    let mut common: Option<BTreeSet<NaiveDate>> = None;
    for (_, prices) in &per_symbol {
        let dates: BTreeSet<NaiveDate> = prices.keys().copied().collect();
        common = Some(match common {
            None => dates,
            Some(acc) => acc.intersection(&dates).copied().collect(),
        });
    }
    let dates: Vec<NaiveDate> = common.unwrap_or_default().into_iter().collect();

    if dates.is_empty() {
        return Err(DataError::EmptyTable {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
        });
    }

    let columns = per_symbol
        .into_iter()
        .map(|(symbol, prices)| {
            let values = dates.iter().map(|d| prices[d]).collect();
            (symbol, values)
        })
        .collect();

    let table = PriceTable::from_columns(dates, columns)
        .map_err(|e| DataError::Other(e.to_string()))?;

    tracing::debug!(
        rows = table.len(),
        symbols = ?table.symbols(),
        "aligned price table"
    );
    Ok(table)
}

/// Date → price with duplicates collapsed (last wins) and NaN/inf dropped.
fn clean_quotes(quotes: &[RawQuote]) -> BTreeMap<NaiveDate, f64> {
    let mut out = BTreeMap::new();
    for q in quotes {
        out.insert(q.date, q.price());
    }
    out.retain(|_, p| p.is_finite());
    out
}
