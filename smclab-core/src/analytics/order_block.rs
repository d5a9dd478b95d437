//! Order-block candidates — strong candles expected to precede an opposite reaction.

use crate::domain::Candle;

/// Fraction of the range the body must exceed for an order-block candidate.
pub const ORDER_BLOCK_BODY_RATIO: f64 = 0.5;

/// A strong bearish candle: bearish, with a body larger than half its range.
///
/// It is a *bullish* order-block candidate because it is expected to precede
/// a bullish reaction. A zero-range candle is never a candidate. The ratio
/// comparison is strict, so a body of exactly half the range fails.
pub fn is_bullish_order_block(c: &Candle) -> bool {
    c.is_bearish() && has_dominant_body(c)
}

/// Mirror of [`is_bullish_order_block`] for strong bullish candles.
pub fn is_bearish_order_block(c: &Candle) -> bool {
    c.is_bullish() && has_dominant_body(c)
}

/// The price an order block is anchored at (its open).
pub fn order_block_level(c: &Candle) -> f64 {
    c.open
}

fn has_dominant_body(c: &Candle) -> bool {
    let range = c.range();
    if range.is_nan() || range <= 0.0 {
        return false;
    }
    c.body_size().abs() > ORDER_BLOCK_BODY_RATIO * range
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_candle;

    #[test]
    fn exactly_half_the_range_is_not_an_order_block() {
        // range = 20, |body| = 10 -> 50%, strict comparison fails
        let c = test_candle(0, 100.0, 105.0, 85.0, 90.0);
        assert!(!is_bullish_order_block(&c));
    }

    #[test]
    fn sixty_percent_body_is_a_bullish_order_block() {
        // range = 25, |body| = 15 -> 60%
        let c = test_candle(0, 100.0, 105.0, 80.0, 85.0);
        assert!(is_bullish_order_block(&c));
        assert!(!is_bearish_order_block(&c));
    }

    #[test]
    fn strong_bullish_candle_is_a_bearish_order_block() {
        let c = test_candle(0, 85.0, 105.0, 80.0, 100.0);
        assert!(is_bearish_order_block(&c));
        assert!(!is_bullish_order_block(&c));
    }

    #[test]
    fn zero_range_is_never_an_order_block() {
        let c = test_candle(0, 100.0, 100.0, 100.0, 100.0);
        assert!(!is_bullish_order_block(&c));
        assert!(!is_bearish_order_block(&c));
    }

    #[test]
    fn weak_body_is_not_an_order_block() {
        let c = test_candle(0, 100.0, 110.0, 90.0, 98.0);
        assert!(!is_bullish_order_block(&c));
    }

    #[test]
    fn level_is_the_open() {
        let c = test_candle(0, 100.0, 105.0, 80.0, 85.0);
        assert_eq!(order_block_level(&c), 100.0);
    }
}
