//! RSI mean-reversion strategy.
//!
//! Buy when RSI drops below the oversold threshold while flat; sell when it
//! rises above the overbought threshold while long.

use crate::domain::candle::Candle;
use crate::domain::error::QuantError;
use crate::domain::indicator::rsi::rsi;
use crate::domain::order::OrderSide;
use crate::domain::strategy::{Signal, Strategy};

#[derive(Debug)]
pub struct RsiStrategy {
    period: usize,
    oversold: f64,
    overbought: f64,
    position_size: f64,

    prices: Vec<f64>,
    in_position: bool,
}

impl RsiStrategy {
    pub fn new(period: usize, oversold: f64, overbought: f64, position_size: f64) -> Self {
        RsiStrategy {
            period,
            oversold,
            overbought,
            position_size,
            prices: Vec::new(),
            in_position: false,
        }
    }
}

impl Strategy for RsiStrategy {
    fn initialize(&mut self) {
        self.prices.clear();
        self.in_position = false;
    }

    fn on_candle(&mut self, candle: &Candle) -> Result<Option<Signal>, QuantError> {
        self.prices.push(candle.close);

        if self.prices.len() < self.period + 1 {
            return Ok(None);
        }

        let value = rsi(&self.prices, self.period);

        if value < self.oversold && !self.in_position {
            self.in_position = true;
            return Ok(Some(Signal {
                action: OrderSide::Buy,
                quantity: self.position_size,
                price: 0.0,
                reason: format!("RSI Oversold: {value:.2} < {:.2}", self.oversold),
            }));
        }

        if value > self.overbought && self.in_position {
            self.in_position = false;
            return Ok(Some(Signal {
                action: OrderSide::Sell,
                quantity: self.position_size,
                price: 0.0,
                reason: format!("RSI Overbought: {value:.2} > {:.2}", self.overbought),
            }));
        }

        Ok(None)
    }

    fn name(&self) -> String {
        format!(
            "RSI_{}_{:.0}_{:.0}",
            self.period, self.oversold, self.overbought
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn make_candle(index: usize, close: f64) -> Candle {
        let open_time =
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::hours(index as i64);
        Candle {
            symbol: "BTCUSDT".into(),
            open_time,
            close_time: open_time + Duration::minutes(59),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    fn run(strategy: &mut RsiStrategy, prices: &[f64]) -> Vec<Signal> {
        prices
            .iter()
            .enumerate()
            .filter_map(|(i, &p)| strategy.on_candle(&make_candle(i, p)).unwrap())
            .collect()
    }

    #[test]
    fn name_encodes_parameters() {
        assert_eq!(RsiStrategy::new(14, 30.0, 70.0, 0.01).name(), "RSI_14_30_70");
    }

    #[test]
    fn buys_on_decline_then_sells_on_recovery() {
        let mut strategy = RsiStrategy::new(14, 30.0, 70.0, 0.01);

        // Steady decline drives RSI to 0, then a steady recovery to 100.
        let mut prices: Vec<f64> = (0..20).map(|i| 200.0 - i as f64 * 2.0).collect();
        prices.extend((0..30).map(|i| 162.0 + i as f64 * 2.0));

        let signals = run(&mut strategy, &prices);
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].action, OrderSide::Buy);
        assert_eq!(signals[1].action, OrderSide::Sell);
    }

    #[test]
    fn no_signal_during_warmup() {
        let mut strategy = RsiStrategy::new(14, 30.0, 70.0, 0.01);
        let prices: Vec<f64> = (0..14).map(|i| 200.0 - i as f64 * 5.0).collect();
        assert!(run(&mut strategy, &prices).is_empty());
    }

    #[test]
    fn never_sells_while_flat() {
        let mut strategy = RsiStrategy::new(14, 30.0, 70.0, 0.01);
        // Straight rally: RSI pegged overbought the whole way, but flat.
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + i as f64 * 3.0).collect();
        let signals = run(&mut strategy, &prices);
        assert!(signals.iter().all(|s| s.action != OrderSide::Sell));
    }

    #[test]
    fn does_not_rebuy_while_long() {
        let mut strategy = RsiStrategy::new(14, 30.0, 70.0, 0.01);
        // Long decline keeps RSI oversold; only the first trigger buys.
        let prices: Vec<f64> = (0..40).map(|i| 300.0 - i as f64 * 4.0).collect();
        let signals = run(&mut strategy, &prices);
        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].action, OrderSide::Buy);
    }

    #[test]
    fn initialize_resets_position_state() {
        let mut strategy = RsiStrategy::new(14, 30.0, 70.0, 0.01);
        let prices: Vec<f64> = (0..20).map(|i| 300.0 - i as f64 * 4.0).collect();
        let signals = run(&mut strategy, &prices);
        assert_eq!(signals.len(), 1);

        strategy.initialize();
        let signals = run(&mut strategy, &prices);
        assert_eq!(signals.len(), 1, "same input re-produces the same buy");
    }
}
