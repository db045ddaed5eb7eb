//! OHLCV candle types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Candle resolution served by the OHLCV provider.
///
/// Only the three resolutions used by the boundary-aligned tier fetch
/// are supported; intermediate aggregates (5m, 4h, ...) are a provider
/// concern we never request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Minute,
    Hour,
    Day,
}

impl Resolution {
    /// Candle duration in seconds
    pub fn seconds(&self) -> i64 {
        match self {
            Resolution::Minute => 60,
            Resolution::Hour => 3_600,
            Resolution::Day => 86_400,
        }
    }

    /// API path segment for this resolution
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Minute => "minute",
            Resolution::Hour => "hour",
            Resolution::Day => "day",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single OHLCV candle. Transient provider data, never persisted.
///
/// `open`/`close` are optional because some providers omit them on
/// sparse pools; the aggregator only needs `high`/`low`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    /// Unix timestamp (seconds) of the candle start
    pub timestamp: i64,
    pub high: f64,
    pub low: f64,
    pub open: Option<f64>,
    pub close: Option<f64>,
}

impl Candle {
    pub fn new(timestamp: i64, high: f64, low: f64) -> Self {
        Self {
            timestamp,
            high,
            low,
            open: None,
            close: None,
        }
    }

    /// Basic consistency check on provider data
    pub fn is_valid(&self) -> bool {
        self.high >= self.low
            && self.high.is_finite()
            && self.low.is_finite()
            && self.low >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_seconds() {
        assert_eq!(Resolution::Minute.seconds(), 60);
        assert_eq!(Resolution::Hour.seconds(), 3600);
        assert_eq!(Resolution::Day.seconds(), 86400);
    }

    #[test]
    fn candle_validity() {
        assert!(Candle::new(0, 2.0, 1.0).is_valid());
        assert!(!Candle::new(0, 1.0, 2.0).is_valid());
        assert!(!Candle::new(0, f64::NAN, 1.0).is_valid());
    }
}
