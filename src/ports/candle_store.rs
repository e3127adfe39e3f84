//! Candle persistence port.

use crate::domain::candle::{Candle, Interval};
use crate::domain::error::QuantError;
use chrono::{DateTime, Utc};

/// Durable, idempotent storage of OHLCV series partitioned by interval.
///
/// Writes upsert on `(symbol, open_time)` within an interval partition:
/// on conflict the close time and OHLCV fields are replaced.
pub trait CandleStore {
    fn save(&self, candle: &Candle, interval: Interval) -> Result<(), QuantError>;

    /// All-or-nothing batch upsert in a single transaction.
    fn save_batch(&self, candles: &[Candle], interval: Interval) -> Result<(), QuantError>;

    /// Candles with `start <= open_time < end`, ascending by open time.
    /// An empty result is not an error.
    fn get_range(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, QuantError>;

    /// The candle with the lowest open time, if any.
    fn get_first(&self, symbol: &str, interval: Interval) -> Result<Option<Candle>, QuantError>;

    /// The candle with the highest open time, if any.
    fn get_latest(&self, symbol: &str, interval: Interval) -> Result<Option<Candle>, QuantError>;
}
