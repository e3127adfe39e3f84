//! OHLCV candle representation and interval model.

use crate::domain::error::QuantError;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::str::FromStr;

/// One fixed-interval summary of price action.
///
/// The interval is not repeated on the record: the store partitions candles
/// by interval, so `(symbol, open_time)` identifies a row within a partition.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub symbol: String,
    pub open_time: DateTime<Utc>,
    pub close_time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// Check the structural field invariants.
    pub fn validate(&self) -> Result<(), QuantError> {
        if self.symbol.is_empty() {
            return Err(QuantError::Validation {
                reason: "empty symbol".into(),
            });
        }
        if self.open_time >= self.close_time {
            return Err(QuantError::Validation {
                reason: format!(
                    "open_time {} is not before close_time {}",
                    self.open_time, self.close_time
                ),
            });
        }
        if self.high < self.open.max(self.close) {
            return Err(QuantError::Validation {
                reason: format!("high {} below max(open, close)", self.high),
            });
        }
        if self.low > self.open.min(self.close) {
            return Err(QuantError::Validation {
                reason: format!("low {} above min(open, close)", self.low),
            });
        }
        if self.volume < 0.0 {
            return Err(QuantError::Validation {
                reason: format!("negative volume {}", self.volume),
            });
        }
        Ok(())
    }
}

/// Candle interval labels supported by the store and the upstream provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    M1,
    M3,
    M5,
    M15,
    M30,
    H1,
    H2,
    H4,
    H6,
    H8,
    H12,
    D1,
    D3,
    W1,
}

impl Interval {
    pub const ALL: [Interval; 14] = [
        Interval::M1,
        Interval::M3,
        Interval::M5,
        Interval::M15,
        Interval::M30,
        Interval::H1,
        Interval::H2,
        Interval::H4,
        Interval::H6,
        Interval::H8,
        Interval::H12,
        Interval::D1,
        Interval::D3,
        Interval::W1,
    ];

    /// The fixed duration one candle of this interval spans.
    pub fn duration(&self) -> Duration {
        match self {
            Interval::M1 => Duration::minutes(1),
            Interval::M3 => Duration::minutes(3),
            Interval::M5 => Duration::minutes(5),
            Interval::M15 => Duration::minutes(15),
            Interval::M30 => Duration::minutes(30),
            Interval::H1 => Duration::hours(1),
            Interval::H2 => Duration::hours(2),
            Interval::H4 => Duration::hours(4),
            Interval::H6 => Duration::hours(6),
            Interval::H8 => Duration::hours(8),
            Interval::H12 => Duration::hours(12),
            Interval::D1 => Duration::days(1),
            Interval::D3 => Duration::days(3),
            Interval::W1 => Duration::weeks(1),
        }
    }

    /// Label used on the wire and as the candle table suffix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M3 => "3m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H2 => "2h",
            Interval::H4 => "4h",
            Interval::H6 => "6h",
            Interval::H8 => "8h",
            Interval::H12 => "12h",
            Interval::D1 => "1d",
            Interval::D3 => "3d",
            Interval::W1 => "1w",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = QuantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .find(|i| i.as_str() == s)
            .copied()
            .ok_or_else(|| QuantError::Validation {
                reason: format!("unknown interval: {s}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_candle() -> Candle {
        Candle {
            symbol: "BTCUSDT".into(),
            open_time: Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap(),
            close_time: Utc.with_ymd_and_hms(2024, 1, 15, 0, 59, 59).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn valid_candle_passes() {
        assert!(sample_candle().validate().is_ok());
    }

    #[test]
    fn empty_symbol_rejected() {
        let mut c = sample_candle();
        c.symbol = String::new();
        assert!(c.validate().is_err());
    }

    #[test]
    fn inverted_times_rejected() {
        let mut c = sample_candle();
        c.close_time = c.open_time;
        assert!(c.validate().is_err());
    }

    #[test]
    fn high_below_close_rejected() {
        let mut c = sample_candle();
        c.high = 104.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn low_above_open_rejected() {
        let mut c = sample_candle();
        c.low = 101.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn negative_volume_rejected() {
        let mut c = sample_candle();
        c.volume = -1.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn interval_roundtrip() {
        for interval in Interval::ALL {
            let parsed: Interval = interval.as_str().parse().unwrap();
            assert_eq!(parsed, interval);
        }
    }

    #[test]
    fn interval_unknown_label() {
        assert!("7m".parse::<Interval>().is_err());
        assert!("".parse::<Interval>().is_err());
    }

    #[test]
    fn interval_durations() {
        assert_eq!(Interval::M1.duration(), Duration::minutes(1));
        assert_eq!(Interval::H4.duration(), Duration::hours(4));
        assert_eq!(Interval::D1.duration(), Duration::days(1));
        assert_eq!(Interval::W1.duration(), Duration::days(7));
    }

    #[test]
    fn interval_display() {
        assert_eq!(Interval::H1.to_string(), "1h");
        assert_eq!(Interval::M15.to_string(), "15m");
    }
}
