//! Trade — a labeled event emitted when price breaches a key level.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::timeframe::Timeframe;
use crate::keylevel::KeyLevelType;

/// Direction label of a trade event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => f.write_str("buy"),
            TradeSide::Sell => f.write_str("sell"),
        }
    }
}

/// A synthetic trade event. This is a label, not an execution: there is no
/// fill model, sizing or position behind it.
///
/// Includes traceability fields so a trade can be tied back to the key level
/// whose breach produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp: DateTime<Utc>,
    pub timeframe: Timeframe,
    pub side: TradeSide,
    pub price: f64,
    /// Zero when the producing detector does not model volume.
    pub volume: f64,

    // ── Traceability ──
    pub key_level: String,
    pub level_type: KeyLevelType,
}
