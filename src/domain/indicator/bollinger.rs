//! Bollinger Bands.

use crate::domain::indicator::ma::sma;

/// Band values at the tail of the price series.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle * 100
    pub width: f64,
    /// Position of the last price within the bands, 0 at lower, 1 at upper.
    pub pct_b: f64,
}

/// Bollinger Bands over the trailing `period` prices.
///
/// `middle` is the SMA; the standard deviation is the population deviation
/// of the window around `middle`. Returns the zero value when there is not
/// enough data.
pub fn bollinger_bands(prices: &[f64], period: usize, multiplier: f64) -> BollingerBands {
    if period == 0 || prices.len() < period {
        return BollingerBands::default();
    }

    let middle = sma(prices, period);

    let start = prices.len() - period;
    let variance: f64 = prices[start..]
        .iter()
        .map(|p| {
            let diff = p - middle;
            diff * diff
        })
        .sum::<f64>()
        / period as f64;
    let std_dev = variance.sqrt();

    let upper = middle + std_dev * multiplier;
    let lower = middle - std_dev * multiplier;
    let width = (upper - lower) / middle * 100.0;

    let current = prices[prices.len() - 1];
    let pct_b = if upper != lower {
        (current - lower) / (upper - lower)
    } else {
        0.0
    };

    BollingerBands {
        upper,
        middle,
        lower,
        width,
        pct_b,
    }
}

/// Bands with the standard (20, 2.0) parameters.
pub fn standard_bollinger_bands(prices: &[f64]) -> BollingerBands {
    bollinger_bands(prices, 20, 2.0)
}
