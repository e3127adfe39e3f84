//! Moving Average Convergence Divergence.

use crate::domain::indicator::ma::ema;

/// MACD values at the tail of the price series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line is `EMA(fast) - EMA(slow)` at the current tail; the signal
/// line is the EMA of the MACD values evaluated over sliding prefixes of
/// the input. Returns the zero value when there are fewer than
/// `slow_period` prices.
pub fn macd(prices: &[f64], fast_period: usize, slow_period: usize, signal_period: usize) -> Macd {
    if slow_period == 0 || prices.len() < slow_period {
        return Macd::default();
    }

    let macd_line = ema(prices, fast_period) - ema(prices, slow_period);

    let mut macd_values = Vec::with_capacity(prices.len() - slow_period + 1);
    for end in slow_period..=prices.len() {
        let fast = ema(&prices[..end], fast_period);
        let slow = ema(&prices[..end], slow_period);
        macd_values.push(fast - slow);
    }

    let signal_line = if macd_values.len() >= signal_period && signal_period > 0 {
        ema(&macd_values, signal_period)
    } else {
        macd_line
    };

    Macd {
        macd: macd_line,
        signal: signal_line,
        histogram: macd_line - signal_line,
    }
}

/// MACD with the standard (12, 26, 9) parameters.
pub fn standard_macd(prices: &[f64]) -> Macd {
    macd(prices, 12, 26, 9)
}
