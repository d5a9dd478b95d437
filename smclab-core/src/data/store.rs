//! In-memory candle store grouped by timeframe.
//!
//! Each timeframe keeps its candles sorted by timestamp plus a timestamp →
//! index map, so neighbor lookups (previous/next candle) are O(1).

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::domain::{Candle, Timeframe};

use super::{CandleSource, DataError};

#[derive(Debug, Clone, Default)]
struct Series {
    candles: Vec<Candle>,
    index: HashMap<DateTime<Utc>, usize>,
}

impl Series {
    fn reindex(&mut self) {
        self.index = self
            .candles
            .iter()
            .enumerate()
            .map(|(i, c)| (c.timestamp, i))
            .collect();
    }
}

/// Candles for any number of timeframes.
#[derive(Debug, Clone, Default)]
pub struct CandleStore {
    series: BTreeMap<Timeframe, Series>,
}

impl CandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `candles` into `timeframe`.
    ///
    /// Input order does not matter. A timestamp that is already present (or
    /// repeated within `candles`) keeps the last candle seen for it.
    pub fn add_candles(&mut self, timeframe: Timeframe, candles: impl IntoIterator<Item = Candle>) {
        let series = self.series.entry(timeframe).or_default();

        let mut by_ts: BTreeMap<DateTime<Utc>, Candle> = series
            .candles
            .drain(..)
            .map(|c| (c.timestamp, c))
            .collect();
        for candle in candles {
            by_ts.insert(candle.timestamp, candle);
        }

        series.candles = by_ts.into_values().collect();
        series.reindex();
    }

    /// Chronologically sorted candles of `timeframe`.
    pub fn candles(&self, timeframe: Timeframe) -> Result<&[Candle], DataError> {
        match self.series.get(&timeframe) {
            Some(s) if !s.candles.is_empty() => Ok(&s.candles),
            _ => Err(DataError::NoData { timeframe }),
        }
    }

    /// The candle at exactly `timestamp`.
    pub fn candle(
        &self,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
    ) -> Result<&Candle, DataError> {
        let (series, i) = self.locate(timeframe, timestamp)?;
        Ok(&series.candles[i])
    }

    /// The candle immediately before `timestamp`.
    ///
    /// `timestamp` must be a candle of this timeframe; the first candle has no
    /// predecessor.
    pub fn previous_candle(
        &self,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
    ) -> Result<&Candle, DataError> {
        let (series, i) = self.locate(timeframe, timestamp)?;
        i.checked_sub(1)
            .map(|prev| &series.candles[prev])
            .ok_or(DataError::NotFound {
                timeframe,
                timestamp,
            })
    }

    /// The candle immediately after `timestamp`.
    pub fn next_candle(
        &self,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
    ) -> Result<&Candle, DataError> {
        let (series, i) = self.locate(timeframe, timestamp)?;
        series.candles.get(i + 1).ok_or(DataError::NotFound {
            timeframe,
            timestamp,
        })
    }

    /// Timeframes that hold at least one candle, shortest first.
    pub fn timeframes(&self) -> Vec<Timeframe> {
        self.series
            .iter()
            .filter(|(_, s)| !s.candles.is_empty())
            .map(|(tf, _)| *tf)
            .collect()
    }

    /// Number of timeframes held.
    pub fn len(&self) -> usize {
        self.timeframes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total candles across all timeframes.
    pub fn candle_count(&self) -> usize {
        self.series.values().map(|s| s.candles.len()).sum()
    }

    fn locate(
        &self,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
    ) -> Result<(&Series, usize), DataError> {
        let series = self
            .series
            .get(&timeframe)
            .filter(|s| !s.candles.is_empty())
            .ok_or(DataError::NoData { timeframe })?;
        let i = series
            .index
            .get(&timestamp)
            .copied()
            .ok_or(DataError::NotFound {
                timeframe,
                timestamp,
            })?;
        Ok((series, i))
    }
}

impl CandleSource for CandleStore {
    fn candles(&self, timeframe: Timeframe) -> Result<&[Candle], DataError> {
        CandleStore::candles(self, timeframe)
    }

    fn previous_candle(
        &self,
        timeframe: Timeframe,
        timestamp: DateTime<Utc>,
    ) -> Result<&Candle, DataError> {
        CandleStore::previous_candle(self, timeframe, timestamp)
    }
}
