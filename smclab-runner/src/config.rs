//! TOML backtest configuration.
//!
//! ```toml
//! [[data]]
//! path = "Bitstamp_ETHUSDT_d.csv"
//! timeframe = "1d"
//!
//! [strategy]
//! detect_fvg = true
//!
//! [run]
//! parallel = true
//! synthetic = false
//! synthetic_candles = 500
//! output_dir = "results"
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use smclab_core::{StrategyConfig, Timeframe};

/// Errors from loading or validating a config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// One candle series to replay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSpec {
    /// CSV file. `None` means synthetic candles (requires `run.synthetic`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub timeframe: Timeframe,
}

/// Execution switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Replay timeframes on the rayon pool instead of sequentially.
    pub parallel: bool,
    /// Fall back to synthetic candles when a CSV is missing or empty.
    pub synthetic: bool,
    pub synthetic_candles: usize,
    pub output_dir: PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            parallel: true,
            synthetic: false,
            synthetic_candles: 500,
            output_dir: PathBuf::from("results"),
        }
    }
}

/// Full configuration for one backtest invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default)]
    pub data: Vec<DataSpec>,
    #[serde(default)]
    pub strategy: StrategyConfig,
    #[serde(default)]
    pub run: RunSettings,
}

impl BacktestConfig {
    /// Read, parse and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one [[data]] entry is required".into(),
            ));
        }

        let mut seen = BTreeSet::new();
        for spec in &self.data {
            if !seen.insert(spec.timeframe) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate timeframe {}",
                    spec.timeframe
                )));
            }
            if spec.path.is_none() && !self.run.synthetic {
                return Err(ConfigError::Invalid(format!(
                    "timeframe {} has no path and run.synthetic is off",
                    spec.timeframe
                )));
            }
        }

        if self.run.synthetic_candles == 0 {
            return Err(ConfigError::Invalid(
                "run.synthetic_candles must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Timeframes in config order.
    pub fn timeframes(&self) -> Vec<Timeframe> {
        self.data.iter().map(|d| d.timeframe).collect()
    }

    /// Deterministic BLAKE3 hash of the config, for result fingerprints.
    ///
    /// Paths enter the hash through their lossy display form, quoted, so
    /// non-UTF-8 paths still hash apart.
    pub fn config_hash(&self) -> String {
        let mut canonical = String::new();
        for d in &self.data {
            let path = match &d.path {
                Some(p) => format!("{:?}", p.to_string_lossy()),
                None => "synthetic".to_string(),
            };
            canonical.push_str(&format!("data {} {path}\n", d.timeframe));
        }
        let st = &self.strategy;
        canonical.push_str(&format!(
            "strategy {} {} {}\n",
            st.detect_fvg, st.detect_order_blocks, st.detect_structure_breaks
        ));
        let run = &self.run;
        canonical.push_str(&format!(
            "run {} {} {} {:?}\n",
            run.parallel,
            run.synthetic,
            run.synthetic_candles,
            run.output_dir.to_string_lossy()
        ));
        blake3::hash(canonical.as_bytes()).to_hex().to_string()
    }
}
