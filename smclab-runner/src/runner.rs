//! Backtest runner — wires together loading, per-timeframe replay, and merging.
//!
//! Entry points:
//! - `run_backtest()`: loads data from the config, then runs. Used by the CLI.
//! - `run_backtest_from_data()`: takes pre-loaded data. No I/O.
//! - `run_timeframe()`: one timeframe against any [`CandleSource`].
//!
//! Each timeframe gets its own strategy and cache; timeframes never share
//! key levels. With `parallel` on, timeframes are replayed on the rayon pool.
//! The merged trade list is sorted by `(timestamp, timeframe, key_level)`, so
//! it does not depend on which worker finished first.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use smclab_core::{
    CandleSource, KeyLevel, KeyLevelType, SmartMoneyStrategy, StrategyConfig, StrategyError,
    Timeframe, Trade,
};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_candles, DataSource, LoadError, LoadOptions, LoadedData};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Load(#[from] LoadError),
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Replay output for one timeframe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeResult {
    pub timeframe: Timeframe,
    pub source: DataSource,
    pub candle_count: usize,
    /// CSV rows dropped by the loader for this timeframe.
    #[serde(default)]
    pub skipped_rows: usize,
    pub first_candle: Option<DateTime<Utc>>,
    pub last_candle: Option<DateTime<Utc>>,
    pub trades: Vec<Trade>,
    /// Structures inserted during the replay, per type.
    pub detections: BTreeMap<KeyLevelType, usize>,
    /// Final cache contents, sorted by `(created_at, name)`.
    pub key_levels: Vec<KeyLevel>,
}

impl TimeframeResult {
    pub fn active_levels(&self) -> usize {
        self.key_levels.iter().filter(|l| l.active).count()
    }

    pub fn detected(&self, level_type: KeyLevelType) -> usize {
        self.detections.get(&level_type).copied().unwrap_or(0)
    }
}

/// A timeframe that failed; the rest of the backtest still completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeframeFailure {
    pub timeframe: Timeframe,
    pub error: String,
}

/// Complete result of a backtest across all configured timeframes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub config_hash: String,
    pub dataset_hash: String,
    pub has_synthetic: bool,
    pub strategy: StrategyConfig,
    /// Successful timeframes, shortest first.
    pub timeframes: Vec<TimeframeResult>,
    pub failures: Vec<TimeframeFailure>,
    /// All trades, sorted by `(timestamp, timeframe, key_level)`.
    pub trades: Vec<Trade>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }

    pub fn timeframe(&self, timeframe: Timeframe) -> Option<&TimeframeResult> {
        self.timeframes.iter().find(|r| r.timeframe == timeframe)
    }

    pub fn candle_count(&self) -> usize {
        self.timeframes.iter().map(|r| r.candle_count).sum()
    }

    pub fn skipped_rows(&self) -> usize {
        self.timeframes.iter().map(|r| r.skipped_rows).sum()
    }
}

/// Load a TOML config from disk and run it.
pub fn run_backtest_from_file(
    path: &Path,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestResult, RunError> {
    let config = BacktestConfig::from_file(path)?;
    run_backtest(&config, cancel)
}

/// Run a backtest from a [`BacktestConfig`] (loads candles first).
pub fn run_backtest(
    config: &BacktestConfig,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let loaded = load_candles(&config.data, &LoadOptions::from(&config.run))?;
    run_backtest_from_data(
        &loaded,
        &config.timeframes(),
        &config.strategy,
        config.run.parallel,
        &config.config_hash(),
        cancel,
    )
}

/// Run a backtest with pre-loaded data — no I/O.
///
/// A timeframe that fails (e.g. no candles) becomes a [`TimeframeFailure`].
/// Cancellation aborts the whole backtest with `RunError::Strategy`.
pub fn run_backtest_from_data(
    loaded: &LoadedData,
    timeframes: &[Timeframe],
    strategy: &StrategyConfig,
    parallel: bool,
    config_hash: &str,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestResult, RunError> {
    info!(
        timeframes = timeframes.len(),
        parallel,
        dataset_hash = %loaded.dataset_hash,
        "starting backtest"
    );

    let source: &dyn CandleSource = &loaded.store;
    let replay = |tf: Timeframe| {
        let data_source = loaded.source(tf).unwrap_or(DataSource::Csv);
        let skipped = loaded.skipped_rows.get(&tf).copied().unwrap_or(0);
        let outcome = run_timeframe(source, tf, data_source, strategy, cancel).map(|mut r| {
            r.skipped_rows = skipped;
            r
        });
        (tf, outcome)
    };

    let outcomes: Vec<(Timeframe, Result<TimeframeResult, StrategyError>)> = if parallel {
        timeframes.par_iter().map(|&tf| replay(tf)).collect()
    } else {
        timeframes.iter().map(|&tf| replay(tf)).collect()
    };

    let mut results = Vec::new();
    let mut failures = Vec::new();
    for (timeframe, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e @ StrategyError::Cancelled { .. }) => return Err(e.into()),
            Err(e) => {
                warn!(%timeframe, error = %e, "timeframe failed");
                failures.push(TimeframeFailure {
                    timeframe,
                    error: e.to_string(),
                });
            }
        }
    }
    results.sort_by_key(|r| r.timeframe);
    failures.sort_by_key(|f| f.timeframe);

    let trades = merge_trades(&results);
    info!(
        trades = trades.len(),
        succeeded = results.len(),
        failed = failures.len(),
        "backtest completed"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        config_hash: config_hash.to_string(),
        dataset_hash: loaded.dataset_hash.clone(),
        has_synthetic: loaded.has_synthetic,
        strategy: *strategy,
        timeframes: results,
        failures,
        trades,
    })
}

/// Replay one timeframe with a fresh strategy and cache.
pub fn run_timeframe(
    source: &dyn CandleSource,
    timeframe: Timeframe,
    data_source: DataSource,
    strategy: &StrategyConfig,
    cancel: Option<&AtomicBool>,
) -> Result<TimeframeResult, StrategyError> {
    let candles = source.candles(timeframe)?;

    let mut smc = SmartMoneyStrategy::new(*strategy);
    let run = smc.run_with_cancel(candles, timeframe, cancel)?;
    let key_levels: Vec<KeyLevel> = smc.cache().iter().cloned().collect();

    Ok(TimeframeResult {
        timeframe,
        source: data_source,
        candle_count: run.candle_count,
        skipped_rows: 0,
        first_candle: candles.first().map(|c| c.timestamp),
        last_candle: candles.last().map(|c| c.timestamp),
        trades: run.trades,
        detections: run.detections,
        key_levels,
    })
}

/// All trades across timeframes, sorted by `(timestamp, timeframe, key_level)`.
pub fn merge_trades(results: &[TimeframeResult]) -> Vec<Trade> {
    let mut trades: Vec<Trade> = results.iter().flat_map(|r| r.trades.iter().cloned()).collect();
    trades.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then(a.timeframe.cmp(&b.timeframe))
            .then_with(|| a.key_level.cmp(&b.key_level))
    });
    trades
}
