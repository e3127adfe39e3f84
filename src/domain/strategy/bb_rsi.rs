//! Bollinger-band + RSI confirmation strategy.
//!
//! Buy when the price touches the lower band (within 1%) with RSI oversold;
//! sell on the mirrored upper-band condition with RSI overbought.

use crate::domain::candle::Candle;
use crate::domain::error::QuantError;
use crate::domain::indicator::bollinger::bollinger_bands;
use crate::domain::indicator::rsi::rsi;
use crate::domain::order::OrderSide;
use crate::domain::strategy::{Signal, Strategy};

#[derive(Debug)]
pub struct BbRsiStrategy {
    bb_period: usize,
    bb_multiplier: f64,
    rsi_period: usize,
    rsi_oversold: f64,
    rsi_overbought: f64,
    position_size: f64,

    prices: Vec<f64>,
    in_position: bool,
}

impl BbRsiStrategy {
    pub fn new(
        bb_period: usize,
        bb_multiplier: f64,
        rsi_period: usize,
        rsi_oversold: f64,
        rsi_overbought: f64,
        position_size: f64,
    ) -> Self {
        BbRsiStrategy {
            bb_period,
            bb_multiplier,
            rsi_period,
            rsi_oversold,
            rsi_overbought,
            position_size,
            prices: Vec::new(),
            in_position: false,
        }
    }
}

impl Strategy for BbRsiStrategy {
    fn initialize(&mut self) {
        self.prices.clear();
        self.in_position = false;
    }

    fn on_candle(&mut self, candle: &Candle) -> Result<Option<Signal>, QuantError> {
        self.prices.push(candle.close);

        let min_period = self.bb_period.max(self.rsi_period);
        if self.prices.len() < min_period + 1 {
            return Ok(None);
        }

        let bb = bollinger_bands(&self.prices, self.bb_period, self.bb_multiplier);
        let rsi_value = rsi(&self.prices, self.rsi_period);
        let price = candle.close;

        if price <= bb.lower * 1.01 && rsi_value < self.rsi_oversold && !self.in_position {
            self.in_position = true;
            return Ok(Some(Signal {
                action: OrderSide::Buy,
                quantity: self.position_size,
                price: 0.0,
                reason: format!("BB Lower ({:.2}) + RSI Oversold ({rsi_value:.2})", bb.lower),
            }));
        }

        if price >= bb.upper * 0.99 && rsi_value > self.rsi_overbought && self.in_position {
            self.in_position = false;
            return Ok(Some(Signal {
                action: OrderSide::Sell,
                quantity: self.position_size,
                price: 0.0,
                reason: format!(
                    "BB Upper ({:.2}) + RSI Overbought ({rsi_value:.2})",
                    bb.upper
                ),
            }));
        }

        Ok(None)
    }

    fn name(&self) -> String {
        format!(
            "BB_RSI_{}_{:.1}_{}",
            self.bb_period, self.bb_multiplier, self.rsi_period
        )
    }
}
