//! Relative Strength Index and its stochastic variant.
//!
//! RSI uses Wilder's smoothing: the first average gain/loss is a simple
//! mean over `period` changes, each subsequent one is
//! `avg = (avg*(period-1) + x) / period`.
//!
//! `RSI = 100 - 100/(1 + avg_gain/avg_loss)`; 100 when avg_loss is 0.

/// RSI over the trailing price series. Returns the neutral 50 when fewer
/// than `period + 1` prices are available.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return 50.0;
    }

    let mut gains = Vec::with_capacity(prices.len() - 1);
    let mut losses = Vec::with_capacity(prices.len() - 1);

    for pair in prices.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gains.push(change);
            losses.push(0.0);
        } else {
            gains.push(0.0);
            losses.push(-change);
        }
    }

    let mut avg_gain: f64 = gains[..period].iter().sum::<f64>() / period as f64;
    let mut avg_loss: f64 = losses[..period].iter().sum::<f64>() / period as f64;

    for i in period..gains.len() {
        avg_gain = (avg_gain * (period - 1) as f64 + gains[i]) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + losses[i]) / period as f64;
    }

    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// Stochastic RSI: the current RSI's position within the range of the last
/// `stoch_period` RSI values, scaled to 0..100. Returns 50 when the series
/// is too short or the RSI window is flat.
pub fn stochastic_rsi(prices: &[f64], rsi_period: usize, stoch_period: usize) -> f64 {
    if rsi_period == 0 || stoch_period == 0 || prices.len() < rsi_period + stoch_period {
        return 50.0;
    }

    let mut rsi_values = Vec::with_capacity(prices.len() - rsi_period + 1);
    for end in rsi_period..=prices.len() {
        rsi_values.push(rsi(&prices[..end], rsi_period));
    }

    if rsi_values.len() < stoch_period {
        return 50.0;
    }

    let recent = &rsi_values[rsi_values.len() - stoch_period..];
    let highest = recent.iter().fold(f64::MIN, |a, &b| a.max(b));
    let lowest = recent.iter().fold(f64::MAX, |a, &b| a.min(b));

    if highest == lowest {
        return 50.0;
    }

    let current = *rsi_values.last().unwrap();
    (current - lowest) / (highest - lowest) * 100.0
}
