//! Three-candle sliding window over a chronologically sorted series.

use crate::domain::Candle;

/// `prev`/`curr`/`next` view at one index. Boundary candles have a missing
/// neighbor.
#[derive(Debug, Clone, Copy)]
pub struct CandleWindow<'a> {
    pub prev: Option<&'a Candle>,
    pub curr: &'a Candle,
    pub next: Option<&'a Candle>,
}

impl<'a> CandleWindow<'a> {
    /// Window centered on `candles[index]`.
    ///
    /// # Panics
    /// If `index` is out of bounds.
    pub fn at(candles: &'a [Candle], index: usize) -> Self {
        Self {
            prev: index.checked_sub(1).map(|i| &candles[i]),
            curr: &candles[index],
            next: candles.get(index + 1),
        }
    }

    /// Both neighbors present, i.e. the window is eligible for swing detection.
    pub fn neighbors(&self) -> Option<(&'a Candle, &'a Candle)> {
        Some((self.prev?, self.next?))
    }
}
