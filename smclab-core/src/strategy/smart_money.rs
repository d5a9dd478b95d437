//! Smart-money replay strategy.
//!
//! One pass over a timeframe's candles, `Start → Scanning(0) → … →
//! Scanning(n-1) → Done`, no backtracking. Per candle:
//!
//! 1. Evaluate the key-level cache against the candle's low; every breached
//!    record emits a sell trade at that low.
//! 2. Run the optional detectors (structure breaks, fair-value gaps, order
//!    blocks) and insert what they find.
//! 3. Detect swing lows/highs over the `prev`/`curr`/`next` window and insert
//!    them under per-occurrence names.
//!
//! Swing confirmation uses the *next* candle, as the original replay did.
//! Structures inserted at step `i` are first evaluated at step `i + 1`.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info};

use crate::analytics::{
    fvg_range, is_bearish_order_block, is_break_of_structure, is_bullish_order_block,
    is_swing_high, is_swing_low, Bias, BreakDirection,
};
use crate::domain::{Candle, Timeframe, Trade, TradeSide};
use crate::keylevel::{key_level_name, KeyLevelCache, KeyLevelType};

use super::window::CandleWindow;
use super::{StrategyConfig, StrategyError, StrategyRun};

/// Replays candles against an exclusively owned [`KeyLevelCache`].
///
/// The cache persists across [`run`](Self::run) calls, so levels seeded via
/// [`with_cache`](Self::with_cache) or left active by a previous run are
/// evaluated by the next one. Use one instance per timeframe.
#[derive(Debug, Clone, Default)]
pub struct SmartMoneyStrategy {
    cache: KeyLevelCache,
    config: StrategyConfig,
    /// Most recent confirmed swing high not yet broken upward.
    last_swing_high: Option<f64>,
    /// Most recent confirmed swing low not yet broken downward.
    last_swing_low: Option<f64>,
}

impl SmartMoneyStrategy {
    pub fn new(config: StrategyConfig) -> Self {
        Self::with_cache(KeyLevelCache::new(), config)
    }

    /// Start from a pre-populated cache (e.g. manually drawn levels).
    pub fn with_cache(cache: KeyLevelCache, config: StrategyConfig) -> Self {
        Self {
            cache,
            config,
            last_swing_high: None,
            last_swing_low: None,
        }
    }

    pub fn name(&self) -> &str {
        "smart_money"
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn cache(&self) -> &KeyLevelCache {
        &self.cache
    }

    pub fn into_cache(self) -> KeyLevelCache {
        self.cache
    }

    /// Replay `candles` (oldest first) for `timeframe`.
    pub fn run(
        &mut self,
        candles: &[Candle],
        timeframe: Timeframe,
    ) -> Result<StrategyRun, StrategyError> {
        self.run_with_cancel(candles, timeframe, None)
    }

    /// Like [`run`](Self::run), checking `cancel` once per candle.
    ///
    /// A cancelled run returns `Cancelled` and no trades; the cache keeps the
    /// state reached at the point of cancellation.
    pub fn run_with_cancel(
        &mut self,
        candles: &[Candle],
        timeframe: Timeframe,
        cancel: Option<&AtomicBool>,
    ) -> Result<StrategyRun, StrategyError> {
        if candles.is_empty() {
            return Err(StrategyError::NoData { timeframe });
        }

        info!(
            strategy = self.name(),
            %timeframe,
            candles = candles.len(),
            "starting replay"
        );

        self.last_swing_high = None;
        self.last_swing_low = None;

        let mut run = StrategyRun {
            timeframe,
            candle_count: candles.len(),
            trades: Vec::new(),
            detections: BTreeMap::new(),
        };

        for i in 0..candles.len() {
            if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
                info!(%timeframe, processed = i, "replay cancelled");
                return Err(StrategyError::Cancelled {
                    timeframe,
                    processed: i,
                });
            }
            self.step(CandleWindow::at(candles, i), &mut run);
        }

        info!(
            strategy = self.name(),
            %timeframe,
            trades = run.trades.len(),
            key_levels = self.cache.len(),
            "replay completed"
        );
        Ok(run)
    }

    fn step(&mut self, window: CandleWindow<'_>, run: &mut StrategyRun) {
        let curr = window.curr;

        // ─── Breach evaluation ───
        for level in self.cache.check_price_breach(curr.low) {
            info!(
                timeframe = %run.timeframe,
                level_type = %level.level_type(),
                level = %level.kind,
                price = curr.low,
                "breached key level"
            );
            run.trades.push(Trade {
                timestamp: curr.timestamp,
                timeframe: run.timeframe,
                side: TradeSide::Sell,
                price: curr.low,
                volume: 0.0,
                key_level: level.name,
                level_type: level.kind.level_type(),
            });
        }

        // ─── Optional detectors ───
        if self.config.detect_structure_breaks {
            self.detect_structure_breaks(curr, run);
        }

        if self.config.detect_fvg {
            if let Some(prev) = window.prev {
                if let Some((low, high)) = fvg_range(prev, curr) {
                    let name = key_level_name(KeyLevelType::Fvg, curr.timestamp);
                    self.cache.add_fvg(&name, low, high, curr);
                    run.record(KeyLevelType::Fvg);
                }
            }
        }

        if self.config.detect_order_blocks {
            let direction = if is_bullish_order_block(curr) {
                Some(Bias::Bullish)
            } else if is_bearish_order_block(curr) {
                Some(Bias::Bearish)
            } else {
                None
            };
            if let Some(direction) = direction {
                let name = key_level_name(KeyLevelType::OrderBlock, curr.timestamp);
                self.cache.add_order_block(&name, direction, curr);
                run.record(KeyLevelType::OrderBlock);
            }
        }

        // ─── Swing points ───
        let Some((prev, next)) = window.neighbors() else {
            return;
        };

        if is_swing_low(curr, prev, next) {
            let name = key_level_name(KeyLevelType::SwingLow, curr.timestamp);
            debug!(%name, price = curr.low, "swing low");
            self.cache.add_swing_low(&name, Bias::Bullish, curr);
            self.last_swing_low = Some(curr.low);
            run.record(KeyLevelType::SwingLow);
        }
        if is_swing_high(curr, prev, next) {
            let name = key_level_name(KeyLevelType::SwingHigh, curr.timestamp);
            debug!(%name, price = curr.high, "swing high");
            self.cache.add_swing_high(&name, Bias::Bearish, curr);
            self.last_swing_high = Some(curr.high);
            run.record(KeyLevelType::SwingHigh);
        }
    }

    /// Insert an MSB when `curr` trades through the last unbroken swing point.
    fn detect_structure_breaks(&mut self, curr: &Candle, run: &mut StrategyRun) {
        let base = key_level_name(KeyLevelType::Msb, curr.timestamp);

        if let Some(high) = self.last_swing_high {
            if is_break_of_structure(curr, high, BreakDirection::Up) {
                let name = format!("{base}:{}", Bias::Bullish);
                self.cache.add_msb(&name, Bias::Bullish, high, curr);
                self.last_swing_high = None;
                run.record(KeyLevelType::Msb);
            }
        }
        if let Some(low) = self.last_swing_low {
            if is_break_of_structure(curr, low, BreakDirection::Down) {
                let name = format!("{base}:{}", Bias::Bearish);
                self.cache.add_msb(&name, Bias::Bearish, low, curr);
                self.last_swing_low = None;
                run.record(KeyLevelType::Msb);
            }
        }
    }
}
