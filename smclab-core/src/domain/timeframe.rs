//! Timeframe — the candle interval a series is sampled at.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::data::DataError;

/// Candle interval. Each timeframe is replayed independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMinute,
    #[serde(rename = "5m")]
    FiveMinute,
    #[serde(rename = "15m")]
    FifteenMinute,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHour,
    #[serde(rename = "1d")]
    Daily,
}

impl Timeframe {
    /// Short label, e.g. `"1h"`.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::OneMinute => "1m",
            Timeframe::FiveMinute => "5m",
            Timeframe::FifteenMinute => "15m",
            Timeframe::OneHour => "1h",
            Timeframe::FourHour => "4h",
            Timeframe::Daily => "1d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::OneMinute => Duration::minutes(1),
            Timeframe::FiveMinute => Duration::minutes(5),
            Timeframe::FifteenMinute => Duration::minutes(15),
            Timeframe::OneHour => Duration::hours(1),
            Timeframe::FourHour => Duration::hours(4),
            Timeframe::Daily => Duration::days(1),
        }
    }

    /// All timeframes, shortest first.
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::OneMinute,
            Timeframe::FiveMinute,
            Timeframe::FifteenMinute,
            Timeframe::OneHour,
            Timeframe::FourHour,
            Timeframe::Daily,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::all()
            .iter()
            .copied()
            .find(|tf| tf.label() == s)
            .ok_or_else(|| DataError::InvalidTimeframe(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_labels() {
        assert_eq!("1m".parse::<Timeframe>().unwrap(), Timeframe::OneMinute);
        assert_eq!("4h".parse::<Timeframe>().unwrap(), Timeframe::FourHour);
        assert_eq!("1d".parse::<Timeframe>().unwrap(), Timeframe::Daily);
    }

    #[test]
    fn parse_rejects_unknown_label() {
        let err = "2w".parse::<Timeframe>().unwrap_err();
        assert!(matches!(err, DataError::InvalidTimeframe(ref s) if s == "2w"));
    }

    #[test]
    fn every_timeframe_has_a_duration() {
        for tf in Timeframe::all() {
            assert!(tf.duration() > Duration::zero(), "{tf} has no duration");
        }
        assert_eq!(Timeframe::FourHour.duration(), Duration::hours(4));
    }

    #[test]
    fn label_roundtrips_through_serde() {
        for tf in Timeframe::all() {
            let json = serde_json::to_string(tf).unwrap();
            assert_eq!(json, format!("\"{}\"", tf.label()));
            let back: Timeframe = serde_json::from_str(&json).unwrap();
            assert_eq!(back, *tf);
        }
    }
}
