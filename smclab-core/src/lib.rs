//! SMC Lab Core — candle analytics, key-level cache, strategy replay.
//!
//! This crate contains the heart of the smart-money backtester:
//! - Domain types (candles, timeframes, trades)
//! - Stateless candle analytics (swings, fair-value gaps, order blocks, structure breaks)
//! - Key-level records and the cache that evaluates them against price
//! - Candle store grouped by timeframe
//! - Single-pass strategy loop that turns breaches into sell trades

pub mod analytics;
pub mod data;
pub mod domain;
pub mod keylevel;
pub mod strategy;

pub use analytics::{AnalyticsError, Bias, BreakDirection};
pub use data::{CandleSource, CandleStore, DataError};
pub use domain::{Candle, Timeframe, Trade, TradeSide};
pub use keylevel::{key_level_name, KeyLevel, KeyLevelCache, KeyLevelKind, KeyLevelType};
pub use strategy::{run_strategy, SmartMoneyStrategy, StrategyConfig, StrategyError, StrategyRun};
