//! SMC Lab Runner — backtest orchestration, candle loading, export.
//!
//! This crate builds on `smclab-core` to provide:
//! - TOML configuration with validation
//! - CSV candle loading with synthetic fallback and dataset hashing
//! - Per-timeframe replay on the rayon pool with deterministic merging
//! - JSON, CSV and Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, DataSpec, RunSettings};
pub use data_loader::{
    load_candles, read_csv_candles, CsvCandles, DataSource, LoadError, LoadOptions, LoadedData,
};
pub use export::{
    export_json, export_levels_csv, export_trades_csv, generate_report, import_json,
    load_artifacts, save_artifacts,
};
pub use runner::{
    merge_trades, run_backtest, run_backtest_from_data, run_backtest_from_file, run_timeframe,
    BacktestResult, RunError, TimeframeFailure, TimeframeResult, SCHEMA_VERSION,
};
