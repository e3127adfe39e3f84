//! Historical data ingestion.
//!
//! Pages a bounded time window from the upstream provider and persists it
//! through the candle store. Fail fast, no retries: upserts make a rerun
//! safe, so the caller resumes from wherever the last run stopped.

use crate::domain::cancel::CancelToken;
use crate::domain::candle::{Candle, Interval};
use crate::domain::error::QuantError;
use crate::ports::candle_store::CandleStore;
use crate::ports::kline_provider::{KlineProvider, RawKline};
use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info};

/// Provider hard cap on candles per request.
const MAX_PAGE: usize = 1000;

/// Courtesy delay between pages.
const PACING_DELAY: std::time::Duration = std::time::Duration::from_millis(100);

pub struct Collector<'a, P: KlineProvider, S: CandleStore> {
    provider: &'a P,
    store: &'a S,
    pacing: std::time::Duration,
}

impl<'a, P: KlineProvider, S: CandleStore> Collector<'a, P, S> {
    pub fn new(provider: &'a P, store: &'a S) -> Self {
        Collector {
            provider,
            store,
            pacing: PACING_DELAY,
        }
    }

    /// Override the pacing delay (tests use zero).
    pub fn with_pacing(mut self, pacing: std::time::Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Fetch and persist all candles for `[start, end)`.
    ///
    /// Returns the number of candles written. Cancellation is honored
    /// between pages; the in-flight page still persists.
    pub fn collect(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        cancel: &CancelToken,
    ) -> Result<usize, QuantError> {
        info!(
            symbol,
            interval = %interval,
            %start,
            %end,
            "collecting historical data"
        );

        let step_ms = interval.duration().num_milliseconds();
        let end_ms = end.timestamp_millis();
        let mut cursor_ms = start.timestamp_millis();
        let mut total = 0usize;

        while cursor_ms < end_ms {
            if cancel.is_cancelled() {
                info!(total, "collection cancelled");
                break;
            }

            let batch_end_ms = (cursor_ms + step_ms * MAX_PAGE as i64).min(end_ms);
            let limit = (((batch_end_ms - cursor_ms) / step_ms) as usize).clamp(1, MAX_PAGE);

            let klines =
                self.provider
                    .fetch_klines(symbol, interval.as_str(), cursor_ms, batch_end_ms, limit)?;

            if klines.is_empty() {
                break;
            }

            let candles: Vec<Candle> = klines
                .iter()
                .map(|k| normalize_kline(symbol, k))
                .collect::<Result<_, _>>()?;

            self.store.save_batch(&candles, interval)?;

            total += candles.len();
            debug!(page = candles.len(), total, "saved candles");

            cursor_ms = klines[klines.len() - 1].close_ms + 1;

            if !self.pacing.is_zero() {
                std::thread::sleep(self.pacing);
            }
        }

        info!(symbol, total, "historical data collection complete");
        Ok(total)
    }
}

/// Parse a raw kline into a validated candle. Timestamps are truncated to
/// whole seconds; numeric strings must parse.
fn normalize_kline(symbol: &str, kline: &RawKline) -> Result<Candle, QuantError> {
    let parse = |field: &str, value: &str| -> Result<f64, QuantError> {
        value.parse::<f64>().map_err(|_| QuantError::Upstream {
            reason: format!("unparseable kline {field}: {value:?}"),
        })
    };

    let candle = Candle {
        symbol: symbol.to_string(),
        open_time: Utc
            .timestamp_opt(kline.open_ms / 1000, 0)
            .single()
            .ok_or_else(|| QuantError::Upstream {
                reason: format!("invalid kline open time: {}", kline.open_ms),
            })?,
        close_time: Utc
            .timestamp_opt(kline.close_ms / 1000, 0)
            .single()
            .ok_or_else(|| QuantError::Upstream {
                reason: format!("invalid kline close time: {}", kline.close_ms),
            })?,
        open: parse("open", &kline.open)?,
        high: parse("high", &kline.high)?,
        low: parse("low", &kline.low)?,
        close: parse("close", &kline.close)?,
        volume: parse("volume", &kline.volume)?,
    };

    candle.validate()?;
    Ok(candle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Serves a fixed 1h series and records every request.
    struct MockProvider {
        open_times: Vec<i64>,
        requests: RefCell<Vec<(i64, i64, usize)>>,
    }

    impl MockProvider {
        fn hourly(start_ms: i64, count: usize) -> Self {
            MockProvider {
                open_times: (0..count as i64).map(|i| start_ms + i * 3_600_000).collect(),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl KlineProvider for MockProvider {
        fn fetch_klines(
            &self,
            _symbol: &str,
            _interval: &str,
            start_ms: i64,
            end_ms: i64,
            limit: usize,
        ) -> Result<Vec<RawKline>, QuantError> {
            self.requests.borrow_mut().push((start_ms, end_ms, limit));
            Ok(self
                .open_times
                .iter()
                .filter(|&&t| t >= start_ms && t <= end_ms)
                .take(limit)
                .map(|&t| RawKline {
                    open_ms: t,
                    close_ms: t + 3_599_999,
                    open: "100.0".into(),
                    high: "101.0".into(),
                    low: "99.0".into(),
                    close: "100.5".into(),
                    volume: "1000.0".into(),
                })
                .collect())
        }
    }

    /// In-memory store counting batches.
    #[derive(Default)]
    struct MockStore {
        rows: RefCell<HashMap<i64, Candle>>,
        batches: RefCell<usize>,
        fail_batches: bool,
    }

    impl CandleStore for MockStore {
        fn save(&self, candle: &Candle, _interval: Interval) -> Result<(), QuantError> {
            self.rows
                .borrow_mut()
                .insert(candle.open_time.timestamp(), candle.clone());
            Ok(())
        }

        fn save_batch(&self, candles: &[Candle], interval: Interval) -> Result<(), QuantError> {
            if self.fail_batches {
                return Err(QuantError::Storage {
                    reason: "disk full".into(),
                });
            }
            *self.batches.borrow_mut() += 1;
            for candle in candles {
                self.save(candle, interval)?;
            }
            Ok(())
        }

        fn get_range(
            &self,
            _symbol: &str,
            _interval: Interval,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<Candle>, QuantError> {
            let rows = self.rows.borrow();
            let mut out: Vec<Candle> = rows
                .values()
                .filter(|c| c.open_time >= start && c.open_time < end)
                .cloned()
                .collect();
            out.sort_by_key(|c| c.open_time);
            Ok(out)
        }

        fn get_first(
            &self,
            _symbol: &str,
            _interval: Interval,
        ) -> Result<Option<Candle>, QuantError> {
            Ok(self
                .rows
                .borrow()
                .values()
                .min_by_key(|c| c.open_time)
                .cloned())
        }

        fn get_latest(
            &self,
            _symbol: &str,
            _interval: Interval,
        ) -> Result<Option<Candle>, QuantError> {
            Ok(self
                .rows
                .borrow()
                .values()
                .max_by_key(|c| c.open_time)
                .cloned())
        }
    }

    fn ms(hours: i64) -> i64 {
        hours * 3_600_000
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    fn zero_paced<'a>(
        provider: &'a MockProvider,
        store: &'a MockStore,
    ) -> Collector<'a, MockProvider, MockStore> {
        Collector::new(provider, store).with_pacing(std::time::Duration::ZERO)
    }

    #[test]
    fn collects_a_small_window_in_one_page() {
        let provider = MockProvider::hourly(0, 10);
        let store = MockStore::default();

        let total = zero_paced(&provider, &store)
            .collect("BTCUSDT", Interval::H1, at(0), at(ms(10)), &CancelToken::new())
            .unwrap();

        assert_eq!(total, 10);
        assert_eq!(*store.batches.borrow(), 1);
        assert_eq!(provider.requests.borrow().len(), 1);
        // Limit requested matches the window size.
        assert_eq!(provider.requests.borrow()[0].2, 10);
    }

    #[test]
    fn three_thousand_candles_page_three_times() {
        let provider = MockProvider::hourly(0, 3000);
        let store = MockStore::default();

        let total = zero_paced(&provider, &store)
            .collect(
                "BTCUSDT",
                Interval::H1,
                at(0),
                at(ms(3000)),
                &CancelToken::new(),
            )
            .unwrap();

        assert_eq!(total, 3000);
        assert_eq!(provider.requests.borrow().len(), 3);
        for (_, _, limit) in provider.requests.borrow().iter() {
            assert_eq!(*limit, 1000);
        }
        assert_eq!(store.rows.borrow().len(), 3000);
    }

    #[test]
    fn rerun_is_a_no_op_upsert() {
        let provider = MockProvider::hourly(0, 100);
        let store = MockStore::default();
        let collector = zero_paced(&provider, &store);

        collector
            .collect("BTCUSDT", Interval::H1, at(0), at(ms(100)), &CancelToken::new())
            .unwrap();
        collector
            .collect("BTCUSDT", Interval::H1, at(0), at(ms(100)), &CancelToken::new())
            .unwrap();

        assert_eq!(store.rows.borrow().len(), 100);
    }

    #[test]
    fn empty_page_terminates() {
        let provider = MockProvider::hourly(0, 0);
        let store = MockStore::default();

        let total = zero_paced(&provider, &store)
            .collect("BTCUSDT", Interval::H1, at(0), at(ms(5000)), &CancelToken::new())
            .unwrap();

        assert_eq!(total, 0);
        assert_eq!(provider.requests.borrow().len(), 1);
    }

    #[test]
    fn store_failure_surfaces_immediately() {
        let provider = MockProvider::hourly(0, 10);
        let store = MockStore {
            fail_batches: true,
            ..Default::default()
        };

        let err = zero_paced(&provider, &store)
            .collect("BTCUSDT", Interval::H1, at(0), at(ms(10)), &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, QuantError::Storage { .. }));
    }

    #[test]
    fn cancellation_stops_between_pages() {
        let provider = MockProvider::hourly(0, 3000);
        let store = MockStore::default();
        let cancel = CancelToken::new();
        cancel.cancel();

        let total = zero_paced(&provider, &store)
            .collect("BTCUSDT", Interval::H1, at(0), at(ms(3000)), &cancel)
            .unwrap();

        assert_eq!(total, 0);
        assert!(provider.requests.borrow().is_empty());
    }

    #[test]
    fn normalize_truncates_to_seconds() {
        let kline = RawKline {
            open_ms: 1_700_000_000_123,
            close_ms: 1_700_003_599_999,
            open: "1.0".into(),
            high: "2.0".into(),
            low: "0.5".into(),
            close: "1.5".into(),
            volume: "10".into(),
        };
        let candle = normalize_kline("BTCUSDT", &kline).unwrap();
        assert_eq!(candle.open_time.timestamp(), 1_700_000_000);
        assert_eq!(candle.close_time.timestamp(), 1_700_003_599);
        assert_eq!(candle.close, 1.5);
    }

    #[test]
    fn normalize_rejects_bad_numbers() {
        let kline = RawKline {
            open_ms: 0,
            close_ms: 3_599_999,
            open: "abc".into(),
            high: "2.0".into(),
            low: "0.5".into(),
            close: "1.5".into(),
            volume: "10".into(),
        };
        let err = normalize_kline("BTCUSDT", &kline).unwrap_err();
        assert!(matches!(err, QuantError::Upstream { .. }));
    }
}
