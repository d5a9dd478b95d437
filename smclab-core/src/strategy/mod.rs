//! Strategy loop — replays candles against a key-level cache and emits trades.

pub mod smart_money;
pub mod window;

pub use smart_money::SmartMoneyStrategy;
pub use window::CandleWindow;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::DataError;
use crate::domain::{Candle, Timeframe, Trade};
use crate::keylevel::KeyLevelType;

/// Structured error types for strategy replays.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("no data for timeframe {timeframe}")]
    NoData { timeframe: Timeframe },

    #[error("replay of {timeframe} cancelled after {processed} candles")]
    Cancelled {
        timeframe: Timeframe,
        processed: usize,
    },

    #[error(transparent)]
    Data(#[from] DataError),
}

/// Optional detectors layered on top of swing detection.
///
/// All off by default: a default replay only trades levels that were
/// seeded into the cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Insert a `fvg` zone for each gap between consecutive candles.
    pub detect_fvg: bool,
    /// Insert an `orderBlock` annotation for each strong-bodied candle.
    pub detect_order_blocks: bool,
    /// Insert an `msb` when price trades through the last unbroken swing.
    pub detect_structure_breaks: bool,
}

/// Output of one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRun {
    pub timeframe: Timeframe,
    pub candle_count: usize,
    /// Emitted trades, in candle order.
    pub trades: Vec<Trade>,
    /// Structures inserted by the replay, per type.
    pub detections: BTreeMap<KeyLevelType, usize>,
}

impl StrategyRun {
    pub fn detected(&self, level_type: KeyLevelType) -> usize {
        self.detections.get(&level_type).copied().unwrap_or(0)
    }

    pub(crate) fn record(&mut self, level_type: KeyLevelType) {
        *self.detections.entry(level_type).or_insert(0) += 1;
    }
}

/// Replay `candles` with a fresh cache and default configuration.
pub fn run_strategy(candles: &[Candle], timeframe: Timeframe) -> Result<Vec<Trade>, StrategyError> {
    let mut strategy = SmartMoneyStrategy::new(StrategyConfig::default());
    Ok(strategy.run(candles, timeframe)?.trades)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_partial_toml() {
        let cfg: StrategyConfig = serde_json::from_str(r#"{"detect_fvg": true}"#).unwrap();
        assert!(cfg.detect_fvg);
        assert!(!cfg.detect_order_blocks);
        assert!(!cfg.detect_structure_breaks);
        assert_eq!(StrategyConfig::default(), serde_json::from_str("{}").unwrap());
    }

    #[test]
    fn data_errors_propagate_unchanged() {
        let err: StrategyError = DataError::NoData {
            timeframe: Timeframe::FiveMinute,
        }
        .into();
        assert_eq!(err.to_string(), "no data for timeframe 5m");
        assert!(matches!(err, StrategyError::Data(DataError::NoData { .. })));
    }

    #[test]
    fn run_strategy_empty_is_no_data() {
        let err = run_strategy(&[], Timeframe::Daily).unwrap_err();
        assert_eq!(err, StrategyError::NoData { timeframe: Timeframe::Daily });
    }
}
