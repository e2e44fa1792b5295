//! End-to-end tests of the analysis core on synthetic pairs.

use chrono::NaiveDate;
use pairlab_core::analysis::{
    estimate_hedge_ratio, run_backtest, test_stationarity, SignalConfig, StationarityConfig,
};
use pairlab_core::data::synthetic::{business_days, cointegrated_pair};
use pairlab_core::data::{build_price_table, PriceProvider, PriceTable, SyntheticProvider};
use pairlab_core::PairError;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn pair_table(a: Vec<f64>, b: Vec<f64>) -> PriceTable {
    let dates: Vec<NaiveDate> = business_days(d("2023-01-02"), d("2025-12-31"))
        .into_iter()
        .take(a.len())
        .collect();
    assert_eq!(dates.len(), a.len());
    PriceTable::from_columns(dates, vec![("A".into(), a), ("B".into(), b)]).unwrap()
}

#[test]
fn three_hundred_day_cointegrated_pair() {
    let (a, b) = cointegrated_pair(300, 0.1, 2024);
    let table = pair_table(a, b);

    let fit = estimate_hedge_ratio(&table, "A", "B").unwrap();
    assert!(
        (fit.hedge_ratio - 1.0).abs() <= 0.2,
        "hedge ratio {}",
        fit.hedge_ratio
    );

    let verdict = test_stationarity(&fit.spread, &StationarityConfig::default()).unwrap();
    assert!(verdict.is_stationary, "{verdict:?}");

    let a = table.series("A").unwrap();
    let b = table.series("B").unwrap();
    let out = run_backtest(a.values, b.values, &fit.spread, &SignalConfig::default()).unwrap();
    assert!(out.summary.sharpe_ratio.is_finite());
    assert!(out.summary.total_return_pct.is_finite());
    assert_eq!(out.cumulative_returns.len(), 300);
    assert_eq!(out.cumulative_returns[0], 1.0);
    assert_eq!(out.strategy_returns[0], 0.0);
    assert!(out.signals[..29].iter().all(|p| p.is_flat()));
}

#[test]
fn cointegrated_pairs_are_stationary_across_seeds() {
    for seed in 1..=5 {
        let (a, b) = cointegrated_pair(300, 0.1, seed);
        let fit = estimate_hedge_ratio(&pair_table(a, b), "A", "B").unwrap();
        let verdict = test_stationarity(&fit.spread, &StationarityConfig::default()).unwrap();
        assert!(verdict.is_stationary, "seed {seed}: {verdict:?}");
    }
}

#[test]
fn provider_to_backtest() {
    let provider = SyntheticProvider::new("PEP", "KO", 42).with_noise(0.2);
    let (start, end) = (d("2022-01-01"), d("2024-01-01"));
    let fetches = vec![
        provider.fetch("PEP", start, end).unwrap(),
        provider.fetch("KO", start, end).unwrap(),
    ];
    let table = build_price_table(&fetches, &["PEP", "KO"]).unwrap();
    assert_eq!(table.symbols(), &["PEP".to_string(), "KO".to_string()]);

    let fit = estimate_hedge_ratio(&table, "PEP", "KO").unwrap();
    let out = run_backtest(
        table.series("PEP").unwrap().values,
        table.series("KO").unwrap().values,
        &fit.spread,
        &SignalConfig::default(),
    )
    .unwrap();
    assert_eq!(out.len(), table.len());
}

#[test]
fn missing_identifier_stops_before_any_analysis() {
    let (a, b) = cointegrated_pair(60, 0.1, 3);
    let table = pair_table(a, b);
    let err = estimate_hedge_ratio(&table, "A", "XYZ").unwrap_err();
    assert_eq!(
        err,
        PairError::MissingInstrument {
            symbol: "XYZ".into()
        }
    );
    assert!(err.to_string().contains("XYZ"));
}

#[test]
fn short_table_fails_backtest_with_empty_series() {
    let (a, b) = cointegrated_pair(25, 0.1, 4);
    let table = pair_table(a.clone(), b.clone());
    let fit = estimate_hedge_ratio(&table, "A", "B").unwrap();
    assert!(matches!(
        run_backtest(&a, &b, &fit.spread, &SignalConfig::default()),
        Err(PairError::EmptySeries {
            required: 31,
            actual: 25
        })
    ));
}
