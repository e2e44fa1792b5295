//! PairLab CLI — pair analysis and price inspection commands.
//!
//! Commands:
//! - `run` — hedge ratio, ADF test and z-score backtest for a pair, from flags
//!   or a TOML config file
//! - `prices` — fetch both legs and print the head of the aligned price table

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use pairlab_runner::export::render_summary;
use pairlab_runner::{
    build_provider, load_prices, run_pair, save_artifacts, LoadOptions, PairConfig, SourceKind,
};

#[derive(Parser)]
#[command(
    name = "pairlab",
    version,
    about = "PairLab: statistical-arbitrage pairs analysis"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pair pipeline and print the summary.
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Rolling z-score window in trading days.
        #[arg(long)]
        window: Option<usize>,

        /// Absolute z-score that opens a position.
        #[arg(long)]
        entry: Option<f64>,

        /// Absolute z-score below which positions are closed.
        #[arg(long)]
        exit: Option<f64>,

        /// Stop before the backtest when the spread is not stationary.
        #[arg(long, default_value_t = false)]
        require_stationary: bool,

        /// Output directory for run artifacts.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_artifacts: bool,
    },
    /// Fetch both legs and print the first rows of the aligned table.
    Prices {
        #[command(flatten)]
        data: DataArgs,

        /// Number of rows to print.
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
}

/// Flags shared by every command that loads prices.
#[derive(Args)]
struct DataArgs {
    /// Path to a TOML config file. Flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dependent leg (e.g. PEP).
    #[arg(long)]
    asset_a: Option<String>,

    /// Independent leg (e.g. KO).
    #[arg(long)]
    asset_b: Option<String>,

    /// Start date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD), inclusive.
    #[arg(long)]
    end: Option<String>,

    /// Use generated cointegrated prices instead of a download.
    #[arg(long, default_value_t = false, conflicts_with = "csv")]
    synthetic: bool,

    /// Read prices from a wide or long CSV file.
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Seed for synthetic prices.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() {
    init_tracing();

    if let Err(err) = run(Cli::parse()) {
        tracing::error!(error = %format!("{err:#}"), "pairlab failed");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Run {
            data,
            window,
            entry,
            exit,
            require_stationary,
            output_dir,
            no_artifacts,
        } => {
            let mut config = data.into_config()?;
            if let Some(window) = window {
                config.signal.window = window;
            }
            if let Some(entry) = entry {
                config.signal.entry_threshold = entry;
            }
            if let Some(exit) = exit {
                config.signal.exit_threshold = exit;
            }
            if require_stationary {
                config.stationarity.require_stationary = true;
            }
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            if no_artifacts {
                config.output.write_artifacts = false;
            }
            run_pair_cmd(&config)
        }
        Commands::Prices { data, rows } => run_prices_cmd(&data.into_config()?, rows),
    }
}

impl DataArgs {
    /// Config file (or defaults) with the data flags applied on top, validated.
    fn into_config(self) -> Result<PairConfig> {
        let mut config = match &self.config {
            Some(path) => PairConfig::from_file(path)?,
            None => PairConfig::default(),
        };

        if let Some(a) = self.asset_a {
            config.pair.asset_a = a;
        }
        if let Some(b) = self.asset_b {
            config.pair.asset_b = b;
        }
        if let Some(start) = self.start.as_deref() {
            config.pair.start_date = parse_date(start, "--start")?;
        }
        if let Some(end) = self.end.as_deref() {
            config.pair.end_date = parse_date(end, "--end")?;
        }
        if self.synthetic {
            config.provider.source = SourceKind::Synthetic;
        }
        if let Some(path) = self.csv {
            config.provider.source = SourceKind::Csv;
            config.provider.csv_path = Some(path);
        }
        if let Some(seed) = self.seed {
            config.provider.seed = seed;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parse_date(s: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("{flag}: expected YYYY-MM-DD, got '{s}'"))
}

fn run_pair_cmd(config: &PairConfig) -> Result<()> {
    let provider = build_provider(config)?;
    let result = run_pair(config, provider.as_ref())?;

    print!("{}", render_summary(&result));

    if config.output.write_artifacts {
        let run_dir = save_artifacts(&result, &config.output.dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }

    Ok(())
}

fn run_prices_cmd(config: &PairConfig, rows: usize) -> Result<()> {
    let provider = build_provider(config)?;
    let symbols = [config.pair.asset_a.as_str(), config.pair.asset_b.as_str()];
    let loaded = load_prices(&symbols, provider.as_ref(), &LoadOptions::from_config(config))?;
    let table = &loaded.table;

    println!(
        "{} aligned rows, {} to {}",
        table.len(),
        table.dates().first().map(|d| d.to_string()).unwrap_or_default(),
        table.dates().last().map(|d| d.to_string()).unwrap_or_default()
    );
    if loaded.has_synthetic {
        println!("Data: SYNTHETIC");
    }
    println!();

    print!("{:<12}", "Date");
    for symbol in table.symbols() {
        print!(" {symbol:>12}");
    }
    println!();
    println!("{}", "-".repeat(12 + 13 * table.symbols().len()));
    for (date, prices) in table.head(rows) {
        print!("{:<12}", date.to_string());
        for price in prices {
            print!(" {price:>12.4}");
        }
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "pairlab",
            "run",
            "--asset-a",
            "XOM",
            "--asset-b",
            "CVX",
            "--start",
            "2020-01-01",
            "--end",
            "2021-01-01",
            "--synthetic",
            "--seed",
            "9",
        ])
        .unwrap();
        let Commands::Run { data, .. } = cli.command else {
            panic!("expected run");
        };
        let config = data.into_config().unwrap();
        assert_eq!(config.pair.asset_a, "XOM");
        assert_eq!(config.pair.asset_b, "CVX");
        assert_eq!(config.provider.source, SourceKind::Synthetic);
        assert_eq!(config.provider.seed, 9);
    }

    #[test]
    fn bad_date_names_the_flag() {
        let cli = Cli::try_parse_from(["pairlab", "prices", "--start", "01/02/2022"]).unwrap();
        let Commands::Prices { data, .. } = cli.command else {
            panic!("expected prices");
        };
        let err = data.into_config().unwrap_err();
        assert!(format!("{err:#}").contains("--start"));
    }

    #[test]
    fn synthetic_and_csv_conflict() {
        assert!(Cli::try_parse_from(["pairlab", "run", "--synthetic", "--csv", "p.csv"]).is_err());
    }

    #[test]
    fn synthetic_run_without_artifacts() {
        let cli = Cli::try_parse_from([
            "pairlab",
            "run",
            "--synthetic",
            "--no-artifacts",
            "--window",
            "20",
        ])
        .unwrap();
        run(cli).unwrap();
    }
}
