//! Moving-average crossover strategy.
//!
//! Buy on a golden cross (fast MA crosses above slow MA), sell on a death
//! cross. The `last_cross` tag suppresses repeated signals while the same
//! side stays crossed, and sells are gated on holding a position.

use crate::domain::candle::Candle;
use crate::domain::error::QuantError;
use crate::domain::indicator::ma::sma;
use crate::domain::order::OrderSide;
use crate::domain::strategy::{Signal, Strategy};

const SIGNAL_QUANTITY: f64 = 0.01;

#[derive(Debug)]
pub struct MaCrossStrategy {
    fast_period: usize,
    slow_period: usize,

    prices: Vec<f64>,
    fast_ma: Vec<f64>,
    slow_ma: Vec<f64>,
    last_cross: Option<Cross>,
    in_position: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cross {
    Golden,
    Death,
}

impl MaCrossStrategy {
    pub fn new(fast_period: usize, slow_period: usize) -> Self {
        MaCrossStrategy {
            fast_period,
            slow_period,
            prices: Vec::new(),
            fast_ma: Vec::new(),
            slow_ma: Vec::new(),
            last_cross: None,
            in_position: false,
        }
    }
}

impl Strategy for MaCrossStrategy {
    fn initialize(&mut self) {
        self.prices.clear();
        self.fast_ma.clear();
        self.slow_ma.clear();
        self.last_cross = None;
        self.in_position = false;
    }

    fn on_candle(&mut self, candle: &Candle) -> Result<Option<Signal>, QuantError> {
        self.prices.push(candle.close);

        if self.prices.len() < self.slow_period {
            return Ok(None);
        }

        let fast = sma(&self.prices, self.fast_period);
        let slow = sma(&self.prices, self.slow_period);
        self.fast_ma.push(fast);
        self.slow_ma.push(slow);

        if self.fast_ma.len() < 2 {
            return Ok(None);
        }

        let prev_fast = self.fast_ma[self.fast_ma.len() - 2];
        let curr_fast = self.fast_ma[self.fast_ma.len() - 1];
        let prev_slow = self.slow_ma[self.slow_ma.len() - 2];
        let curr_slow = self.slow_ma[self.slow_ma.len() - 1];

        if prev_fast <= prev_slow
            && curr_fast > curr_slow
            && self.last_cross != Some(Cross::Golden)
            && !self.in_position
        {
            self.last_cross = Some(Cross::Golden);
            self.in_position = true;
            return Ok(Some(Signal {
                action: OrderSide::Buy,
                quantity: SIGNAL_QUANTITY,
                price: 0.0,
                reason: format!("Golden Cross: Fast MA ({curr_fast:.2}) > Slow MA ({curr_slow:.2})"),
            }));
        }

        if prev_fast >= prev_slow
            && curr_fast < curr_slow
            && self.last_cross != Some(Cross::Death)
            && self.in_position
        {
            self.last_cross = Some(Cross::Death);
            self.in_position = false;
            return Ok(Some(Signal {
                action: OrderSide::Sell,
                quantity: SIGNAL_QUANTITY,
                price: 0.0,
                reason: format!("Death Cross: Fast MA ({curr_fast:.2}) < Slow MA ({curr_slow:.2})"),
            }));
        }

        Ok(None)
    }

    fn name(&self) -> String {
        format!("MA_Cross_{}_{}", self.fast_period, self.slow_period)
    }
}
