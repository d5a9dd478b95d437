//! Candle analytics — stateless pattern recognition over one to three candles.
//!
//! Every function here is pure: no shared state, no side effects, safe to call
//! in any order or from any thread. Single-candle derived values (range, body
//! size, direction) live on [`Candle`](crate::domain::Candle) itself.

pub mod direction;
pub mod fair_value_gap;
pub mod order_block;
pub mod structure;

pub use direction::{Bias, BreakDirection};
pub use fair_value_gap::{fvg_bias, fvg_range, has_fair_value_gap};
pub use order_block::{
    is_bearish_order_block, is_bullish_order_block, order_block_level, ORDER_BLOCK_BODY_RATIO,
};
pub use structure::{
    equal_high, equal_low, is_break_of_structure, is_swing_high, is_swing_low,
    swing_high_liquidity, swing_low_liquidity,
};

use thiserror::Error;

/// Errors from parsing directional tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("invalid direction '{0}'")]
    InvalidDirection(String),
}

/// Build a candle at `2024-01-01 + day` days for analytics tests.
#[cfg(test)]
pub fn test_candle(day: i64, open: f64, high: f64, low: f64, close: f64) -> crate::domain::Candle {
    use chrono::TimeZone;
    let base = chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    crate::domain::Candle::new(
        base + chrono::Duration::days(day),
        open,
        high,
        low,
        close,
        1000.0,
    )
}
