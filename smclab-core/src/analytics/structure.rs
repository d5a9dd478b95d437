//! Market structure — swing points, equal highs/lows, structure breaks.
//!
//! Swing detection needs one candle on each side, so the first and last
//! candle of a series can never be a swing point.

use crate::domain::Candle;

use super::BreakDirection;

/// `c` has a strictly lower low than both neighbors.
pub fn is_swing_low(c: &Candle, prev: &Candle, next: &Candle) -> bool {
    c.low < prev.low && c.low < next.low
}

/// `c` has a strictly higher high than both neighbors.
pub fn is_swing_high(c: &Candle, prev: &Candle, next: &Candle) -> bool {
    c.high > prev.high && c.high > next.high
}

/// Highs within `tolerance` of each other. A negative tolerance never matches.
pub fn equal_high(a: &Candle, b: &Candle, tolerance: f64) -> bool {
    (a.high - b.high).abs() <= tolerance
}

/// Lows within `tolerance` of each other. A negative tolerance never matches.
pub fn equal_low(a: &Candle, b: &Candle, tolerance: f64) -> bool {
    (a.low - b.low).abs() <= tolerance
}

/// Whether `c` trades through `level` in the given direction.
pub fn is_break_of_structure(c: &Candle, level: f64, direction: BreakDirection) -> bool {
    match direction {
        BreakDirection::Up => c.high > level,
        BreakDirection::Down => c.low < level,
    }
}

/// Liquidity resting above a swing high.
pub fn swing_high_liquidity(c: &Candle) -> f64 {
    c.high
}

/// Liquidity resting below a swing low.
pub fn swing_low_liquidity(c: &Candle) -> f64 {
    c.low
}
