//! Reporting and export: JSON, CSV, Markdown and SVG artifact generation.
//!
//! Provides four export formats for pair runs:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: the per-day series (prices, spread, z-score, signal, returns)
//! - **Markdown**: human-readable single-run report
//! - **SVG**: signal diagnostics and cumulative PnL chart
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use plotters::coord::Shift;
use plotters::prelude::*;

use crate::runner::{PairRunResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `PairRunResult` to pretty JSON.
pub fn export_json(result: &PairRunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize PairRunResult to JSON")
}

/// Deserialize a `PairRunResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<PairRunResult> {
    let result: PairRunResult =
        serde_json::from_str(json).context("failed to deserialize PairRunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Export the per-day series as CSV.
///
/// Columns: date, price_a, price_b, spread, zscore, signal, strategy_return,
/// cumulative_return. `zscore` is empty during the warm-up window.
pub fn export_series_csv(result: &PairRunResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "price_a",
        "price_b",
        "spread",
        "zscore",
        "signal",
        "strategy_return",
        "cumulative_return",
    ])?;

    let bt = &result.backtest;
    for (i, date) in result.dates.iter().enumerate() {
        let z = bt.zscores[i].map(|z| format!("{z:.6}")).unwrap_or_default();
        wtr.write_record([
            &date.to_string(),
            &format!("{:.6}", result.price_a[i]),
            &format!("{:.6}", result.price_b[i]),
            &format!("{:.6}", result.hedge.spread[i]),
            &z,
            &bt.signals[i].as_i8().to_string(),
            &format!("{:.8}", bt.strategy_returns[i]),
            &format!("{:.8}", bt.cumulative_returns[i]),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates a directory named `{asset_a}_{asset_b}_{run_id prefix}/` under
/// `output_dir` containing:
/// - `manifest.json`: the full `PairRunResult`
/// - `series.csv`: per-day series
/// - `report.md`: Markdown report
/// - `chart.svg`: z-score diagnostics above the cumulative return curve
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &PairRunResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = result.run_id.chars().take(12).collect();
    let dirname = format!("{}_{}_{}", result.asset_a, result.asset_b, short_id);
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    write_file(&run_dir.join("manifest.json"), &json)?;

    let series = export_series_csv(result)?;
    write_file(&run_dir.join("series.csv"), &series)?;

    write_file(&run_dir.join("report.md"), &generate_report(result))?;

    let chart = render_chart_svg(result)?;
    write_file(&run_dir.join("chart.svg"), &chart)?;

    tracing::info!(dir = %run_dir.display(), "artifacts saved");
    Ok(run_dir)
}

/// Load a `PairRunResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<PairRunResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Charts ─────────────────────────────────────────────────────────

const CHART_SIZE: (u32, u32) = (1200, 800);

/// Render the run as a two-panel SVG.
///
/// The upper panel plots the z-score with the ± entry and exit bands and the
/// held position; the lower panel plots the cumulative return curve. The x
/// axis is the observation index, labelled with its trading date.
pub fn render_chart_svg(result: &PairRunResult) -> Result<String> {
    if result.dates.is_empty() {
        bail!("no observations to chart");
    }
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_err)?;
        let (upper, lower) = root.split_vertically(CHART_SIZE.1 / 2);
        draw_signal_panel(&upper, result)?;
        draw_pnl_panel(&lower, result)?;
        root.present().map_err(draw_err)?;
    }
    Ok(svg)
}

fn draw_signal_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    result: &PairRunResult,
) -> Result<()> {
    let bt = &result.backtest;
    let c = &result.signal_config;
    let x_max = x_extent(result);

    let zscores: Vec<(f64, f64)> = bt
        .zscores
        .iter()
        .enumerate()
        .filter_map(|(i, z)| z.filter(|z| z.is_finite()).map(|z| (i as f64, z)))
        .collect();
    let y_max = zscores
        .iter()
        .map(|(_, z)| z.abs())
        .fold(c.entry_threshold.max(1.0), f64::max)
        * 1.1;

    let label_date = |x: &f64| date_at(result, *x);
    let mut chart = ChartBuilder::on(area)
        .caption(
            format!("{} / {} spread z-score", result.asset_a, result.asset_b),
            ("sans-serif", 22),
        )
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..x_max, -y_max..y_max)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&label_date)
        .y_desc("z-score")
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(LineSeries::new(zscores, BLUE.stroke_width(1)))
        .map_err(draw_err)?
        .label("z-score")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

    for (level, color, label) in [
        (c.entry_threshold, RED, "entry band"),
        (c.exit_threshold, GREEN, "exit band"),
    ] {
        for y in [level, -level] {
            let band = chart
                .draw_series(LineSeries::new(vec![(0.0, y), (x_max, y)], color.stroke_width(1)))
                .map_err(draw_err)?;
            if y > 0.0 {
                band.label(label).legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
            }
        }
    }

    let position = bt
        .signals
        .iter()
        .enumerate()
        .map(|(i, s)| (i as f64, s.as_f64()));
    chart
        .draw_series(LineSeries::new(position, BLACK.stroke_width(1)))
        .map_err(draw_err)?
        .label("position")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2)));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(draw_err)?;
    Ok(())
}

fn draw_pnl_panel(
    area: &DrawingArea<SVGBackend<'_>, Shift>,
    result: &PairRunResult,
) -> Result<()> {
    let curve = &result.backtest.cumulative_returns;
    let x_max = x_extent(result);
    let (lo, hi) = curve
        .iter()
        .filter(|v| v.is_finite())
        .fold((1.0f64, 1.0f64), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    let pad = ((hi - lo) * 0.05).max(1e-3);

    let label_date = |x: &f64| date_at(result, *x);
    let mut chart = ChartBuilder::on(area)
        .caption("Cumulative return", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..x_max, (lo - pad)..(hi + pad))
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .x_labels(8)
        .x_label_formatter(&label_date)
        .y_desc("growth of 1")
        .draw()
        .map_err(draw_err)?;

    chart
        .draw_series(LineSeries::new(
            curve.iter().enumerate().map(|(i, v)| (i as f64, *v)),
            BLUE.stroke_width(2),
        ))
        .map_err(draw_err)?;
    Ok(())
}

/// Right edge of the index axis; at least 1 so a single row still has width.
fn x_extent(result: &PairRunResult) -> f64 {
    result.dates.len().saturating_sub(1).max(1) as f64
}

fn date_at(result: &PairRunResult, x: f64) -> String {
    if x < 0.0 {
        return String::new();
    }
    result
        .dates
        .get(x.round() as usize)
        .map(|d| d.to_string())
        .unwrap_or_default()
}

fn draw_err<E: std::fmt::Display>(err: E) -> anyhow::Error {
    anyhow!("chart rendering failed: {err}")
}

// ─── Text summaries ─────────────────────────────────────────────────

/// Plain-text summary for the terminal.
pub fn render_summary(result: &PairRunResult) -> String {
    let v = &result.stationarity;
    let s = &result.backtest.summary;
    let mut out = String::with_capacity(512);

    out.push_str(&format!(
        "Pair: {} / {}  ({} to {}, {} days)\n",
        result.asset_a,
        result.asset_b,
        result.start_date,
        result.end_date,
        result.observations()
    ));
    if result.has_synthetic {
        out.push_str("Data: SYNTHETIC\n");
    }
    out.push_str(&format!("Hedge ratio: {:.4}\n", result.hedge.hedge_ratio));
    out.push_str(&format!(
        "ADF statistic: {:.4}  p-value: {:.4}  lag: {}\n",
        v.statistic, v.p_value, v.used_lag
    ));
    if v.is_stationary {
        out.push_str("Spread is stationary: the pair is a cointegration candidate.\n");
    } else {
        out.push_str("Spread is NOT stationary: the pair may not be cointegrated.\n");
    }
    out.push_str(&format!("Sharpe ratio: {:.2}\n", s.sharpe_ratio));
    out.push_str(&format!("Total return: {:.2}%\n", s.total_return_pct));
    out
}

// ─── Markdown reports ───────────────────────────────────────────────

/// Generate a Markdown report for a single run.
pub fn generate_report(result: &PairRunResult) -> String {
    let mut md = String::with_capacity(2048);

    md.push_str("# Pairs Trading Report\n\n");

    // Metadata
    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Pair | {} / {} |\n",
        result.asset_a, result.asset_b
    ));
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start_date, result.end_date
    ));
    md.push_str(&format!("| Observations | {} |\n", result.observations()));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Dataset Hash | {} |\n", result.dataset_hash));
    if result.has_synthetic {
        md.push_str("| Data | **SYNTHETIC** |\n");
    }
    md.push('\n');

    // Hedge ratio
    let h = &result.hedge;
    md.push_str("## Hedge Ratio\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Hedge Ratio | {:.4} |\n", h.hedge_ratio));
    md.push_str(&format!("| Intercept | {:.4} |\n", h.intercept));
    md.push_str(&format!(
        "| Price Correlation | {} |\n",
        opt(result.correlation, 3)
    ));
    md.push_str(&format!(
        "| Spread Half-Life (days) | {} |\n",
        opt(result.half_life, 1)
    ));
    md.push('\n');

    // Stationarity
    let v = &result.stationarity;
    md.push_str("## Stationarity (ADF)\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Statistic | {:.4} |\n", v.statistic));
    md.push_str(&format!("| p-value | {:.4} |\n", v.p_value));
    md.push_str(&format!("| Lags | {} |\n", v.used_lag));
    md.push_str(&format!("| Observations | {} |\n", v.n_obs));
    md.push_str(&format!(
        "| Critical Values (1% / 5% / 10%) | {:.3} / {:.3} / {:.3} |\n",
        v.critical_values.one_pct, v.critical_values.five_pct, v.critical_values.ten_pct
    ));
    md.push_str(&format!(
        "| Verdict | {} |\n",
        if v.is_stationary {
            "stationary"
        } else {
            "**not stationary**"
        }
    ));
    md.push('\n');

    // Performance
    let c = &result.signal_config;
    let s = &result.backtest.summary;
    md.push_str("## Performance Summary\n\n");
    md.push_str(&format!(
        "Window {} days, entry ±{}, exit ±{}.\n\n",
        c.window, c.entry_threshold, c.exit_threshold
    ));
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Sharpe | {:.3} |\n", s.sharpe_ratio));
    md.push_str(&format!("| Total Return | {:.2}% |\n", s.total_return_pct));
    md.push_str(&format!(
        "| Annualized Volatility | {:.2}% |\n",
        s.annualized_volatility * 100.0
    ));
    md.push_str(&format!(
        "| Max Drawdown | {:.2}% |\n",
        s.max_drawdown * 100.0
    ));
    md.push_str(&format!("| Position Changes | {} |\n", s.position_changes));
    md.push_str(&format!(
        "| Days in Market | {} of {} |\n",
        s.days_in_market, s.observations
    ));
    md.push('\n');

    md
}

fn opt(v: Option<f64>, decimals: usize) -> String {
    match v {
        Some(x) => format!("{x:.decimals$}"),
        None => "n/a".into(),
    }
}
