//! Fair-value gaps — price intervals two adjacent candles never traded through.

use crate::domain::Candle;

use super::Bias;

/// True iff `a` and `b` (chronologically adjacent) do not overlap.
pub fn has_fair_value_gap(a: &Candle, b: &Candle) -> bool {
    a.low > b.high || b.low > a.high
}

/// Bounds `(low, high)` of the gap between `a` and `b`, if any.
///
/// Bearish gap (`a` entirely above `b`): `(b.high, a.low)`.
/// Bullish gap (`b` entirely above `a`): `(a.high, b.low)`.
pub fn fvg_range(a: &Candle, b: &Candle) -> Option<(f64, f64)> {
    if a.low > b.high {
        Some((b.high, a.low))
    } else if b.low > a.high {
        Some((a.high, b.low))
    } else {
        None
    }
}

/// Direction of the gap between `a` and `b`, if any.
pub fn fvg_bias(a: &Candle, b: &Candle) -> Option<Bias> {
    if b.low > a.high {
        Some(Bias::Bullish)
    } else if a.low > b.high {
        Some(Bias::Bearish)
    } else {
        None
    }
}
