//! Composite trend-following strategy: golden cross + RSI band + Bollinger
//! middle-line confirmation + volume spike.
//!
//! Entry requires all of: fast MA above slow MA, RSI within its band, price
//! above the Bollinger middle band, and volume at least `volume_threshold`
//! times the trailing 20-candle average. Once long, exits on take profit,
//! stop loss, or a death cross, whichever comes first.

use crate::domain::candle::Candle;
use crate::domain::error::QuantError;
use crate::domain::indicator::bollinger::bollinger_bands;
use crate::domain::indicator::ma::sma;
use crate::domain::indicator::rsi::rsi;
use crate::domain::order::OrderSide;
use crate::domain::strategy::{Signal, Strategy};

const VOLUME_LOOKBACK: usize = 20;

#[derive(Debug)]
pub struct GoldenRsiBbStrategy {
    fast_period: usize,
    slow_period: usize,
    rsi_period: usize,
    rsi_lower_bound: f64,
    rsi_upper_bound: f64,
    bb_period: usize,
    bb_multiplier: f64,
    volume_threshold: f64,
    take_profit_pct: f64,
    stop_loss_pct: f64,
    position_size: f64,

    prices: Vec<f64>,
    volumes: Vec<f64>,
    fast_ma: Vec<f64>,
    slow_ma: Vec<f64>,
    in_position: bool,
    entry_price: f64,
}

impl GoldenRsiBbStrategy {
    /// Default parameterization: MA 5/20, RSI 14 in 40..70, BB(20, 2.0),
    /// 1.3x volume spike, +6% take profit, -3% stop loss.
    pub fn new(position_size: f64) -> Self {
        Self::with_params(5, 20, 14, 40.0, 70.0, 20, 2.0, 1.3, 0.06, 0.03, position_size)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_params(
        fast_period: usize,
        slow_period: usize,
        rsi_period: usize,
        rsi_lower_bound: f64,
        rsi_upper_bound: f64,
        bb_period: usize,
        bb_multiplier: f64,
        volume_threshold: f64,
        take_profit_pct: f64,
        stop_loss_pct: f64,
        position_size: f64,
    ) -> Self {
        GoldenRsiBbStrategy {
            fast_period,
            slow_period,
            rsi_period,
            rsi_lower_bound,
            rsi_upper_bound,
            bb_period,
            bb_multiplier,
            volume_threshold,
            take_profit_pct,
            stop_loss_pct,
            position_size,
            prices: Vec::new(),
            volumes: Vec::new(),
            fast_ma: Vec::new(),
            slow_ma: Vec::new(),
            in_position: false,
            entry_price: 0.0,
        }
    }

    fn average_volume(&self) -> f64 {
        let period = VOLUME_LOOKBACK.min(self.volumes.len());
        if period == 0 {
            return 0.0;
        }
        let start = self.volumes.len() - period;
        self.volumes[start..].iter().sum::<f64>() / period as f64
    }

    fn sell_signal(&self, reason: String) -> Signal {
        Signal {
            action: OrderSide::Sell,
            quantity: self.position_size,
            price: 0.0,
            reason,
        }
    }
}

impl Strategy for GoldenRsiBbStrategy {
    fn initialize(&mut self) {
        self.prices.clear();
        self.volumes.clear();
        self.fast_ma.clear();
        self.slow_ma.clear();
        self.in_position = false;
        self.entry_price = 0.0;
    }

    fn on_candle(&mut self, candle: &Candle) -> Result<Option<Signal>, QuantError> {
        self.prices.push(candle.close);
        self.volumes.push(candle.volume);

        if self.prices.len() < self.slow_period {
            return Ok(None);
        }

        let fast = sma(&self.prices, self.fast_period);
        let slow = sma(&self.prices, self.slow_period);
        self.fast_ma.push(fast);
        self.slow_ma.push(slow);

        let bb = bollinger_bands(&self.prices, self.bb_period, self.bb_multiplier);

        if self.prices.len() < self.rsi_period + 1 {
            return Ok(None);
        }
        let rsi_value = rsi(&self.prices, self.rsi_period);

        let price = candle.close;
        let avg_volume = self.average_volume();

        if self.in_position {
            let profit_pct = (price - self.entry_price) / self.entry_price;

            if profit_pct >= self.take_profit_pct {
                self.in_position = false;
                return Ok(Some(self.sell_signal(format!(
                    "Take Profit: +{:.2}% (entry: {:.2}, current: {price:.2})",
                    profit_pct * 100.0,
                    self.entry_price
                ))));
            }

            if profit_pct <= -self.stop_loss_pct {
                self.in_position = false;
                return Ok(Some(self.sell_signal(format!(
                    "Stop Loss: {:.2}% (entry: {:.2}, current: {price:.2})",
                    profit_pct * 100.0,
                    self.entry_price
                ))));
            }

            if self.fast_ma.len() >= 2 {
                let prev_fast = self.fast_ma[self.fast_ma.len() - 2];
                let prev_slow = self.slow_ma[self.slow_ma.len() - 2];

                if prev_fast >= prev_slow && fast < slow {
                    self.in_position = false;
                    return Ok(Some(self.sell_signal(format!(
                        "Death Cross Exit: MA{}({fast:.2}) < MA{}({slow:.2}), P/L: {:.2}%",
                        self.fast_period,
                        self.slow_period,
                        profit_pct * 100.0
                    ))));
                }
            }

            return Ok(None);
        }

        // Entry gates, all required.
        if fast <= slow {
            return Ok(None);
        }
        if rsi_value < self.rsi_lower_bound || rsi_value > self.rsi_upper_bound {
            return Ok(None);
        }
        if price <= bb.middle {
            return Ok(None);
        }
        if candle.volume < avg_volume * self.volume_threshold {
            return Ok(None);
        }

        self.in_position = true;
        self.entry_price = price;

        Ok(Some(Signal {
            action: OrderSide::Buy,
            quantity: self.position_size,
            price: 0.0,
            reason: format!(
                "Golden Entry: MA{}({fast:.2})>MA{}({slow:.2}), RSI({rsi_value:.1}), \
                 Price({price:.2})>BB.Mid({:.2}), Vol({:.0})>Avg({avg_volume:.0})x{:.1}",
                self.fast_period, self.slow_period, bb.middle, candle.volume, self.volume_threshold
            ),
        }))
    }

    fn name(&self) -> String {
        format!(
            "GoldenRSIBB_MA{}_{}_RSI{}_BB{}_Vol{:.1}x",
            self.fast_period, self.slow_period, self.rsi_period, self.bb_period,
            self.volume_threshold
        )
    }
}
