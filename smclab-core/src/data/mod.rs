//! Candle data access — the time-series collaborator of the strategy loop.
//!
//! The loop only needs a chronologically ordered slice of candles per
//! timeframe. [`CandleSource`] abstracts that (plus previous-candle lookup) so
//! the runner can drive any store; [`CandleStore`] is the in-memory one.

pub mod store;

pub use store::CandleStore;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{Candle, Timeframe};

/// Structured error types for candle data access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("no data for timeframe {timeframe}")]
    NoData { timeframe: Timeframe },

    #[error("no candle found for timeframe {timeframe} at {timestamp}")]
    NotFound {
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
    },

    #[error("invalid timeframe: {0}")]
    InvalidTimeframe(String),
}

/// Source of chronologically ordered candles per timeframe.
pub trait CandleSource: Send + Sync {
    /// Candles of `timeframe`, oldest first. `NoData` if there are none.
    fn candles(&self, timeframe: Timeframe) -> Result<&[Candle], DataError>;

    /// The candle immediately preceding `timestamp` in `timeframe`.
    fn previous_candle(
        &self,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
    ) -> Result<&Candle, DataError>;
}
