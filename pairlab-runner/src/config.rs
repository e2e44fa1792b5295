//! TOML run configuration.
//!
//! Only `[pair]` is required; every other section falls back to defaults that
//! reproduce the reference PEP/KO run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use pairlab_core::analysis::{LagSelection, SignalConfig, StationarityConfig};
use pairlab_core::PairError;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Analysis(#[from] PairError),
}

/// Complete configuration of a single pair run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PairConfig {
    pub pair: PairSection,
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub stationarity: StationaritySection,
    #[serde(default)]
    pub provider: ProviderSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSection {
    /// Dependent leg.
    pub asset_a: String,
    /// Independent leg.
    pub asset_b: String,
    /// Inclusive.
    pub start_date: NaiveDate,
    /// Inclusive.
    pub end_date: NaiveDate,
}

impl Default for PairSection {
    fn default() -> Self {
        Self {
            asset_a: "PEP".into(),
            asset_b: "KO".into(),
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StationaritySection {
    pub significance: f64,
    pub min_observations: usize,
    pub lag_selection: LagSelection,
    /// Stop before the backtest when the spread is not stationary.
    pub require_stationary: bool,
}

impl Default for StationaritySection {
    fn default() -> Self {
        let test = StationarityConfig::default();
        Self {
            significance: test.significance,
            min_observations: test.min_observations,
            lag_selection: test.lag_selection,
            require_stationary: false,
        }
    }
}

impl StationaritySection {
    pub fn test_config(&self) -> StationarityConfig {
        StationarityConfig {
            significance: self.significance,
            min_observations: self.min_observations,
            lag_selection: self.lag_selection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Yahoo,
    Csv,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub source: SourceKind,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Price file for `source = "csv"`.
    pub csv_path: Option<PathBuf>,
    /// Seed for `source = "synthetic"`.
    pub seed: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        Self {
            source: SourceKind::Yahoo,
            timeout_secs: 30,
            max_retries: 3,
            base_delay_ms: 500,
            csv_path: None,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub dir: PathBuf,
    pub write_artifacts: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
            write_artifacts: true,
        }
    }
}

impl PairConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: PairConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pair = &self.pair;
        if pair.asset_a.trim().is_empty() || pair.asset_b.trim().is_empty() {
            return Err(ConfigError::Invalid("asset identifiers must not be empty".into()));
        }
        if pair.asset_a == pair.asset_b {
            return Err(ConfigError::Invalid(format!(
                "asset_a and asset_b are both '{}'",
                pair.asset_a
            )));
        }
        if pair.end_date <= pair.start_date {
            return Err(ConfigError::Invalid(format!(
                "end_date {} must be after start_date {}",
                pair.end_date, pair.start_date
            )));
        }
        self.signal.validate()?;
        self.stationarity.test_config().validate()?;
        if self.provider.source == SourceKind::Csv && self.provider.csv_path.is_none() {
            return Err(ConfigError::Invalid(
                "provider.csv_path is required when source = \"csv\"".into(),
            ));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("provider.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Deterministic hash of everything that affects the result.
    ///
    /// The output section is excluded, so moving the artifact directory does not
    /// change the id.
    pub fn run_id(&self) -> RunId {
        let identity = (&self.pair, &self.signal, &self.stationarity, &self.provider);
        let json = serde_json::to_string(&identity).unwrap_or_else(|_| format!("{identity:?}"));
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }

    pub fn is_synthetic(&self) -> bool {
        self.provider.source == SourceKind::Synthetic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[pair]
asset_a = "PEP"
asset_b = "KO"
start_date = "2022-01-01"
end_date = "2024-01-01"
"#;

    #[test]
    fn minimal_config_uses_defaults() {
        let config = PairConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config, PairConfig::default());
        assert_eq!(config.signal.window, 30);
        assert_eq!(config.stationarity.lag_selection, LagSelection::Aic);
        assert!(!config.stationarity.require_stationary);
        assert_eq!(config.provider.source, SourceKind::Yahoo);
        assert!(config.output.write_artifacts);
    }

    #[test]
    fn full_config_parses() {
        let toml = r#"
[pair]
asset_a = "XOM"
asset_b = "CVX"
start_date = "2020-01-01"
end_date = "2021-06-30"

[signal]
window = 20
entry_threshold = 2.0
exit_threshold = 0.25

[stationarity]
significance = 0.01
lag_selection = { fixed = 4 }
require_stationary = true

[provider]
source = "csv"
csv_path = "prices.csv"

[output]
dir = "out"
write_artifacts = false
"#;
        let config = PairConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.pair.asset_a, "XOM");
        assert_eq!(config.signal.window, 20);
        assert_eq!(config.signal.entry_threshold, 2.0);
        assert_eq!(config.stationarity.lag_selection, LagSelection::Fixed(4));
        assert_eq!(config.stationarity.min_observations, 20);
        assert!(config.stationarity.require_stationary);
        assert_eq!(config.provider.source, SourceKind::Csv);
        assert_eq!(config.provider.csv_path, Some(PathBuf::from("prices.csv")));
        assert_eq!(config.provider.timeout_secs, 30);
        assert_eq!(config.output.dir, PathBuf::from("out"));
    }

    #[test]
    fn missing_pair_section_is_a_parse_error() {
        let err = PairConfig::from_toml_str("[signal]\nwindow = 10\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn identical_assets_are_rejected() {
        let mut config = PairConfig::default();
        config.pair.asset_b = "PEP".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn reversed_dates_are_rejected() {
        let mut config = PairConfig::default();
        config.pair.end_date = config.pair.start_date;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn overlapping_bands_surface_as_analysis_error() {
        let mut config = PairConfig::default();
        config.signal.exit_threshold = 2.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Analysis(PairError::InvalidConfiguration { .. }))
        ));
    }

    #[test]
    fn csv_source_requires_path() {
        let mut config = PairConfig::default();
        config.provider.source = SourceKind::Csv;
        assert!(config.validate().is_err());
        config.provider.csv_path = Some("p.csv".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn run_id_is_deterministic_and_ignores_output() {
        let a = PairConfig::default();
        let mut b = a.clone();
        assert_eq!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 64);

        b.output.dir = "elsewhere".into();
        assert_eq!(a.run_id(), b.run_id());

        b.signal.window = 45;
        assert_ne!(a.run_id(), b.run_id());
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = PairConfig::from_file(Path::new("/nonexistent/pairlab.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("pairlab.toml"));
    }
}
