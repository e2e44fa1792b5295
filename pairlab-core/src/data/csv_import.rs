//! CSV price import.
//!
//! Two table shapes are accepted and normalized to one price per symbol per date:
//!
//! - **wide**: `date,PEP,KO,...` — one column per symbol.
//! - **long**: `date,symbol,adj_close,close` — one row per (date, symbol). The
//!   price column is picked in order `adj_close`, `close`, `price`, mirroring the
//!   "Adj Close, else Close" rule of the download path.
//!
//! Empty cells and `NaN` parse as missing and are dropped during alignment.

use super::provider::{DataError, DataSource, FetchResult, PriceProvider, RawQuote};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// Detected layout of an imported table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableShape {
    Wide,
    Long,
}

/// Provider backed by a price table loaded from CSV.
#[derive(Debug, Clone)]
pub struct CsvPriceProvider {
    shape: TableShape,
    quotes: HashMap<String, Vec<RawQuote>>,
}

impl CsvPriceProvider {
    pub fn from_path(path: &Path) -> Result<Self, DataError> {
        let file = std::fs::File::open(path)
            .map_err(|e| DataError::Csv(format!("cannot open {}: {e}", path.display())))?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DataError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = rdr.headers()?.iter().map(normalize_header).collect();

        let date_col = headers
            .iter()
            .position(|h| h == "date" || h == "timestamp")
            .ok_or_else(|| DataError::Csv("missing 'date' column".into()))?;
        let symbol_col = headers.iter().position(|h| h == "symbol" || h == "ticker");

        let (shape, mut quotes) = match symbol_col {
            Some(sym_col) => (TableShape::Long, read_long(&mut rdr, &headers, date_col, sym_col)?),
            None => (TableShape::Wide, read_wide(&mut rdr, &headers, date_col)?),
        };

        for series in quotes.values_mut() {
            series.sort_by_key(|q| q.date);
        }

        tracing::debug!(?shape, symbols = quotes.len(), "loaded CSV price table");
        Ok(Self { shape, quotes })
    }

    pub fn shape(&self) -> TableShape {
        self.shape
    }

    /// Symbols present in the table, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = self.quotes.keys().cloned().collect();
        symbols.sort();
        symbols
    }
}

impl PriceProvider for CsvPriceProvider {
    fn name(&self) -> &str {
        "csv_import"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let series = self
            .quotes
            .get(symbol)
            .ok_or_else(|| DataError::MissingInstrument {
                symbol: symbol.to_string(),
            })?;

        let quotes: Vec<RawQuote> = series
            .iter()
            .filter(|q| q.date >= start && q.date <= end)
            .copied()
            .collect();

        Ok(FetchResult {
            symbol: symbol.to_string(),
            quotes,
            source: DataSource::CsvImport,
        })
    }
}

fn read_wide<R: Read>(
    rdr: &mut csv::Reader<R>,
    headers: &[String],
    date_col: usize,
) -> Result<HashMap<String, Vec<RawQuote>>, DataError> {
    let raw_headers: Vec<String> = rdr.headers()?.iter().map(str::to_string).collect();
    let mut quotes: HashMap<String, Vec<RawQuote>> = HashMap::new();

    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let date = parse_date(record.get(date_col).unwrap_or(""), line)?;
        for (col, _) in headers.iter().enumerate().filter(|(i, _)| *i != date_col) {
            let price = parse_price(record.get(col).unwrap_or(""));
            quotes
                .entry(raw_headers[col].clone())
                .or_default()
                .push(RawQuote::new(date, price));
        }
    }
    Ok(quotes)
}

fn read_long<R: Read>(
    rdr: &mut csv::Reader<R>,
    headers: &[String],
    date_col: usize,
    symbol_col: usize,
) -> Result<HashMap<String, Vec<RawQuote>>, DataError> {
    let find = |name: &str| headers.iter().position(|h| h == name);
    let adj_col = find("adj_close");
    let close_col = find("close").or_else(|| find("price"));
    if adj_col.is_none() && close_col.is_none() {
        return Err(DataError::Csv(
            "long table needs an 'adj_close', 'close' or 'price' column".into(),
        ));
    }

    let mut quotes: HashMap<String, Vec<RawQuote>> = HashMap::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record?;
        let date = parse_date(record.get(date_col).unwrap_or(""), line)?;
        let symbol = record.get(symbol_col).unwrap_or("").to_string();
        if symbol.is_empty() {
            return Err(DataError::Csv(format!("row {}: empty symbol", line + 2)));
        }
        let cell = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .map(parse_price)
                .unwrap_or(f64::NAN)
        };
        quotes.entry(symbol).or_default().push(RawQuote {
            date,
            close: cell(close_col),
            adj_close: cell(adj_col),
        });
    }
    Ok(quotes)
}

fn normalize_header(h: &str) -> String {
    h.trim().to_ascii_lowercase().replace([' ', '-'], "_")
}

fn parse_date(s: &str, line: usize) -> Result<NaiveDate, DataError> {
    // Accept both plain dates and "YYYY-MM-DD HH:MM:SS" timestamps
    let day = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| DataError::Csv(format!("row {}: bad date '{s}': {e}", line + 2)))
}

fn parse_price(s: &str) -> f64 {
    s.parse::<f64>().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn reads_wide_table() {
        let csv = "Date,PEP,KO\n2024-01-02,170.1,59.2\n2024-01-03,171.0,\n";
        let provider = CsvPriceProvider::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(provider.shape(), TableShape::Wide);
        assert_eq!(provider.symbols(), vec!["KO".to_string(), "PEP".to_string()]);

        let ko = provider.fetch("KO", d("2024-01-01"), d("2024-12-31")).unwrap();
        assert_eq!(ko.quotes.len(), 2);
        assert_eq!(ko.quotes[0].price(), 59.2);
        assert!(ko.quotes[1].price().is_nan());
        assert_eq!(ko.source, DataSource::CsvImport);
    }

    #[test]
    fn reads_long_table_preferring_adjusted_close() {
        let csv = "date,symbol,close,adj_close\n\
                   2024-01-03,PEP,171.0,169.0\n\
                   2024-01-02,PEP,170.0,168.0\n\
                   2024-01-02,KO,59.0,\n";
        let provider = CsvPriceProvider::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(provider.shape(), TableShape::Long);

        let pep = provider.fetch("PEP", d("2024-01-01"), d("2024-12-31")).unwrap();
        assert_eq!(pep.quotes[0].date, d("2024-01-02"));
        assert_eq!(pep.quotes[0].price(), 168.0);

        let ko = provider.fetch("KO", d("2024-01-01"), d("2024-12-31")).unwrap();
        assert_eq!(ko.quotes[0].price(), 59.0);
    }

    #[test]
    fn fetch_filters_by_date_range() {
        let csv = "date,A\n2024-01-02,1\n2024-01-03,2\n2024-01-04,3\n";
        let provider = CsvPriceProvider::from_reader(csv.as_bytes()).unwrap();
        let a = provider.fetch("A", d("2024-01-03"), d("2024-01-03")).unwrap();
        assert_eq!(a.quotes.len(), 1);
        assert_eq!(a.quotes[0].price(), 2.0);
    }

    #[test]
    fn unknown_symbol_is_missing_instrument() {
        let csv = "date,A\n2024-01-02,1\n";
        let provider = CsvPriceProvider::from_reader(csv.as_bytes()).unwrap();
        assert!(matches!(
            provider.fetch("B", d("2024-01-01"), d("2024-12-31")),
            Err(DataError::MissingInstrument { ref symbol }) if symbol == "B"
        ));
    }

    #[test]
    fn missing_date_column_is_rejected() {
        let csv = "day,A\n2024-01-02,1\n";
        assert!(matches!(
            CsvPriceProvider::from_reader(csv.as_bytes()),
            Err(DataError::Csv(_))
        ));
    }

    #[test]
    fn bad_date_reports_row() {
        let csv = "date,A\n2024-01-02,1\nnot-a-date,2\n";
        let err = CsvPriceProvider::from_reader(csv.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 3"));
    }

    #[test]
    fn timestamp_dates_are_truncated_to_day() {
        let csv = "Date,A\n2024-01-02 00:00:00,1.5\n";
        let provider = CsvPriceProvider::from_reader(csv.as_bytes()).unwrap();
        let a = provider.fetch("A", d("2024-01-02"), d("2024-01-02")).unwrap();
        assert_eq!(a.quotes[0].price(), 1.5);
    }
}
