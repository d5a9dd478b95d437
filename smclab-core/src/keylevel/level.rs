//! Key-level records — named, typed market-structure annotations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::analytics::Bias;
use crate::domain::Candle;

/// Discriminant of a [`KeyLevelKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeyLevelType {
    Level,
    Range,
    Fvg,
    Msb,
    OrderBlock,
    SwingLow,
    SwingHigh,
}

impl KeyLevelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyLevelType::Level => "level",
            KeyLevelType::Range => "range",
            KeyLevelType::Fvg => "fvg",
            KeyLevelType::Msb => "msb",
            KeyLevelType::OrderBlock => "orderBlock",
            KeyLevelType::SwingLow => "swingLow",
            KeyLevelType::SwingHigh => "swingHigh",
        }
    }

    /// Whether breach checking evaluates this variant at all.
    ///
    /// Order blocks and swing points are structural annotations for detectors;
    /// they are stored but never breached.
    pub fn is_breach_target(&self) -> bool {
        matches!(
            self,
            KeyLevelType::Level | KeyLevelType::Range | KeyLevelType::Fvg | KeyLevelType::Msb
        )
    }

    pub fn all() -> &'static [KeyLevelType] {
        &[
            KeyLevelType::Level,
            KeyLevelType::Range,
            KeyLevelType::Fvg,
            KeyLevelType::Msb,
            KeyLevelType::OrderBlock,
            KeyLevelType::SwingLow,
            KeyLevelType::SwingHigh,
        ]
    }
}

impl fmt::Display for KeyLevelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of a key level. Exactly one variant per record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum KeyLevelKind {
    /// A one-shot threshold, breached when price trades at or below it.
    Level { price: f64 },
    /// A zone price may re-enter any number of times.
    Range { low: f64, high: f64 },
    /// An unfilled imbalance between two non-overlapping candles.
    Fvg { low: f64, high: f64 },
    /// A directional structure-break level.
    Msb { direction: Bias, break_point: f64 },
    /// The candle preceding an impulsive opposite move.
    OrderBlock { direction: Bias, origin: Candle },
    SwingLow { bias: Bias, price: f64 },
    SwingHigh { bias: Bias, price: f64 },
}

impl KeyLevelKind {
    pub fn level_type(&self) -> KeyLevelType {
        match self {
            KeyLevelKind::Level { .. } => KeyLevelType::Level,
            KeyLevelKind::Range { .. } => KeyLevelType::Range,
            KeyLevelKind::Fvg { .. } => KeyLevelType::Fvg,
            KeyLevelKind::Msb { .. } => KeyLevelType::Msb,
            KeyLevelKind::OrderBlock { .. } => KeyLevelType::OrderBlock,
            KeyLevelKind::SwingLow { .. } => KeyLevelType::SwingLow,
            KeyLevelKind::SwingHigh { .. } => KeyLevelType::SwingHigh,
        }
    }

    /// Whether `price` satisfies this payload's breach condition.
    ///
    /// Variants that are not breach targets always return false.
    pub fn is_breached_by(&self, price: f64) -> bool {
        match *self {
            KeyLevelKind::Level { price: level } => price <= level,
            KeyLevelKind::Range { low, high } | KeyLevelKind::Fvg { low, high } => {
                low <= price && price <= high
            }
            KeyLevelKind::Msb {
                direction: Bias::Bullish,
                break_point,
            } => price > break_point,
            KeyLevelKind::Msb {
                direction: Bias::Bearish,
                break_point,
            } => price < break_point,
            KeyLevelKind::OrderBlock { .. }
            | KeyLevelKind::SwingLow { .. }
            | KeyLevelKind::SwingHigh { .. } => false,
        }
    }

    /// Whether a breach consumes the record (one-shot) or leaves it active.
    pub fn deactivates_on_breach(&self) -> bool {
        matches!(self, KeyLevelKind::Level { .. })
    }

    /// Representative price, used for logs and reports.
    pub fn reference_price(&self) -> f64 {
        match *self {
            KeyLevelKind::Level { price } => price,
            KeyLevelKind::Range { low, high } | KeyLevelKind::Fvg { low, high } => {
                (low + high) / 2.0
            }
            KeyLevelKind::Msb { break_point, .. } => break_point,
            KeyLevelKind::OrderBlock { ref origin, .. } => origin.open,
            KeyLevelKind::SwingLow { price, .. } | KeyLevelKind::SwingHigh { price, .. } => price,
        }
    }
}

impl fmt::Display for KeyLevelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyLevelKind::Level { price } => write!(f, "level {price:.2}"),
            KeyLevelKind::Range { low, high } => write!(f, "range [{low:.2}, {high:.2}]"),
            KeyLevelKind::Fvg { low, high } => write!(f, "fvg [{low:.2}, {high:.2}]"),
            KeyLevelKind::Msb {
                direction,
                break_point,
            } => write!(f, "{direction} msb {break_point:.2}"),
            KeyLevelKind::OrderBlock { direction, origin } => {
                write!(f, "{direction} orderBlock {:.2}", origin.open)
            }
            KeyLevelKind::SwingLow { price, .. } => write!(f, "swingLow {price:.2}"),
            KeyLevelKind::SwingHigh { price, .. } => write!(f, "swingHigh {price:.2}"),
        }
    }
}

/// A named key level with activation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyLevel {
    /// Identity key within a cache.
    pub name: String,
    pub active: bool,
    /// Timestamp of the candle that produced the record.
    pub created_at: DateTime<Utc>,
    pub kind: KeyLevelKind,
}

impl KeyLevel {
    pub fn new(name: impl Into<String>, kind: KeyLevelKind, created_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            active: true,
            created_at,
            kind,
        }
    }

    pub fn level_type(&self) -> KeyLevelType {
        self.kind.level_type()
    }
}

/// Unique cache name for a structure detected on the candle at `timestamp`.
///
/// Timestamps are unique within a timeframe, so a `(type, timestamp)` pair
/// names at most one structure per timeframe replay.
pub fn key_level_name(level_type: KeyLevelType, timestamp: DateTime<Utc>) -> String {
    format!("{}@{}", level_type.as_str(), timestamp.to_rfc3339())
}
