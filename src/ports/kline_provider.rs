//! Upstream OHLCV provider port.

use crate::domain::error::QuantError;

/// One kline as delivered by the provider: epoch-millisecond timestamps
/// and string-encoded decimal fields.
#[derive(Debug, Clone, PartialEq)]
pub struct RawKline {
    pub open_ms: i64,
    pub close_ms: i64,
    pub open: String,
    pub high: String,
    pub low: String,
    pub close: String,
    pub volume: String,
}

/// A paged kline source.
///
/// Returns up to `limit` entries ascending by open time, with
/// `open_ms` in `[start_ms, end_ms]`. Pagination is caller-driven.
pub trait KlineProvider {
    fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
        limit: usize,
    ) -> Result<Vec<RawKline>, QuantError>;
}
