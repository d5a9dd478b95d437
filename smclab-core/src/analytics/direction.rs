//! Directional vocabulary shared by detectors and key levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::AnalyticsError;

/// Market bias of a structure: which way price is expected to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
}

impl Bias {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bias::Bullish => "bullish",
            Bias::Bearish => "bearish",
        }
    }
}

impl fmt::Display for Bias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bias {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bullish" => Ok(Bias::Bullish),
            "bearish" => Ok(Bias::Bearish),
            other => Err(AnalyticsError::InvalidDirection(other.to_string())),
        }
    }
}

/// Which side of a level a structure break is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakDirection {
    /// The candle's high must exceed the level.
    Up,
    /// The candle's low must undercut the level.
    Down,
}

impl fmt::Display for BreakDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakDirection::Up => f.write_str("up"),
            BreakDirection::Down => f.write_str("down"),
        }
    }
}

impl FromStr for BreakDirection {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "up" => Ok(BreakDirection::Up),
            "down" => Ok(BreakDirection::Down),
            other => Err(AnalyticsError::InvalidDirection(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bias() {
        assert_eq!("bullish".parse::<Bias>().unwrap(), Bias::Bullish);
        assert_eq!("bearish".parse::<Bias>().unwrap(), Bias::Bearish);
    }

    #[test]
    fn parse_break_direction() {
        assert_eq!("up".parse::<BreakDirection>().unwrap(), BreakDirection::Up);
        assert_eq!("down".parse::<BreakDirection>().unwrap(), BreakDirection::Down);
    }

    #[test]
    fn unknown_tokens_are_errors() {
        let err = "sideways".parse::<BreakDirection>().unwrap_err();
        assert_eq!(err, AnalyticsError::InvalidDirection("sideways".into()));
        assert!("Bullish".parse::<Bias>().is_err()); // case-sensitive
        assert!("".parse::<Bias>().is_err());
    }
}
