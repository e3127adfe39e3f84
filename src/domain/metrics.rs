//! Backtest result and performance metrics.

use crate::domain::backtest::{BacktestTrade, EquityPoint};
use crate::domain::order::OrderSide;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Calendar days per year. The market trades 24/7, so annualization uses
/// 365 rather than the 252 trading days of equity markets.
const DAYS_PER_YEAR: f64 = 365.0;

/// Complete output of one backtest run: summary metrics plus the full
/// trade ledger and equity curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub strategy_name: String,

    pub initial_balance: f64,
    pub final_equity: f64,
    /// Fractional return, e.g. 0.10 for +10%.
    pub total_return: f64,

    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,

    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,

    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,

    pub trades: Vec<BacktestTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestResult {
    /// Compute the full result from a finished run's raw outputs.
    pub fn from_run(
        strategy_name: String,
        initial_balance: f64,
        final_balance: f64,
        trades: Vec<BacktestTrade>,
        equity_curve: Vec<EquityPoint>,
    ) -> Self {
        if equity_curve.is_empty() {
            return BacktestResult {
                strategy_name,
                initial_balance,
                final_equity: final_balance,
                total_return: 0.0,
                total_trades: trades.len(),
                winning_trades: 0,
                losing_trades: 0,
                win_rate: 0.0,
                sharpe_ratio: 0.0,
                max_drawdown: 0.0,
                max_drawdown_pct: 0.0,
                start_time: None,
                end_time: None,
                trades,
                equity_curve,
            };
        }

        let final_equity = equity_curve[equity_curve.len() - 1].equity;
        let total_return = if initial_balance > 0.0 {
            (final_equity - initial_balance) / initial_balance
        } else {
            0.0
        };

        let start_time = equity_curve[0].timestamp;
        let end_time = equity_curve[equity_curve.len() - 1].timestamp;

        let (winning_trades, losing_trades, win_rate) = trade_stats(&trades);
        let sharpe_ratio = sharpe(&equity_curve, start_time, end_time);
        let (max_drawdown, max_drawdown_pct) = max_drawdown(&equity_curve);

        BacktestResult {
            strategy_name,
            initial_balance,
            final_equity,
            total_return,
            total_trades: trades.len(),
            winning_trades,
            losing_trades,
            win_rate,
            sharpe_ratio,
            max_drawdown,
            max_drawdown_pct,
            start_time: Some(start_time),
            end_time: Some(end_time),
            trades,
            equity_curve,
        }
    }
}

/// Pair each Sell with the most recent unpaired Buy and classify the PnL.
/// Zero-PnL round trips count as neither win nor loss.
fn trade_stats(trades: &[BacktestTrade]) -> (usize, usize, f64) {
    let mut wins = 0usize;
    let mut losses = 0usize;

    let mut buy_price = 0.0;
    let mut buy_qty = 0.0;

    for trade in trades {
        match trade.side {
            OrderSide::Buy => {
                buy_price = trade.price;
                buy_qty = trade.quantity;
            }
            OrderSide::Sell if buy_price > 0.0 => {
                let pnl = (trade.price - buy_price) * buy_qty;
                if pnl > 0.0 {
                    wins += 1;
                } else if pnl < 0.0 {
                    losses += 1;
                }
                buy_price = 0.0;
                buy_qty = 0.0;
            }
            OrderSide::Sell => {}
        }
    }

    let completed = wins + losses;
    let win_rate = if completed > 0 {
        wins as f64 / completed as f64
    } else {
        0.0
    };

    (wins, losses, win_rate)
}

/// Annualized Sharpe ratio over per-step equity returns.
///
/// The annualization factor is `sqrt(365 / (total_days / n))`, inferring
/// the sampling frequency from the curve's span.
fn sharpe(equity_curve: &[EquityPoint], start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter_map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                Some((w[1].equity - prev) / prev)
            } else {
                None
            }
        })
        .collect();

    if returns.is_empty() {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std_dev = variance.sqrt();

    if std_dev == 0.0 {
        return 0.0;
    }

    let total_days = (end - start).num_seconds() as f64 / 86_400.0;
    if total_days <= 0.0 {
        return 0.0;
    }

    let periods_per_year = DAYS_PER_YEAR / (total_days / n);
    (mean / std_dev) * periods_per_year.sqrt()
}

/// Single pass over the equity curve tracking the running peak. Returns
/// the largest decline in absolute and fractional terms.
fn max_drawdown(equity_curve: &[EquityPoint]) -> (f64, f64) {
    if equity_curve.is_empty() {
        return (0.0, 0.0);
    }

    let mut peak = equity_curve[0].equity;
    let mut max_dd = 0.0;
    let mut max_dd_pct = 0.0;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }

        let drawdown = peak - point.equity;
        if drawdown > max_dd {
            max_dd = drawdown;
            max_dd_pct = drawdown / peak;
        }
    }

    (max_dd, max_dd_pct)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn make_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                    + Duration::hours(i as i64),
                equity,
                price: 100.0,
            })
            .collect()
    }

    fn make_trade(side: OrderSide, price: f64, quantity: f64) -> BacktestTrade {
        BacktestTrade {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            side,
            price,
            quantity,
            fee: 0.0,
            balance: 0.0,
            position: 0.0,
            reason: String::new(),
        }
    }

    #[test]
    fn empty_curve_gives_zeroed_result() {
        let result =
            BacktestResult::from_run("test".into(), 10_000.0, 10_000.0, vec![], vec![]);
        assert_eq!(result.total_return, 0.0);
        assert_eq!(result.sharpe_ratio, 0.0);
        assert_eq!(result.max_drawdown, 0.0);
        assert!(result.start_time.is_none());
    }

    #[test]
    fn total_return_from_final_equity() {
        let result = BacktestResult::from_run(
            "test".into(),
            10_000.0,
            0.0,
            vec![],
            make_curve(&[10_000.0, 11_000.0]),
        );
        assert!((result.total_return - 0.10).abs() < 1e-9);
        assert_eq!(result.final_equity, 11_000.0);
    }

    #[test]
    fn flat_curve_has_zero_sharpe_and_drawdown() {
        let result = BacktestResult::from_run(
            "test".into(),
            10_000.0,
            0.0,
            vec![],
            make_curve(&[10_000.0; 100]),
        );
        assert_eq!(result.sharpe_ratio, 0.0);
        assert_eq!(result.max_drawdown, 0.0);
        assert_eq!(result.max_drawdown_pct, 0.0);
    }

    #[test]
    fn steady_growth_has_positive_sharpe() {
        let values: Vec<f64> = (0..100)
            .map(|i| 10_000.0 * (1.0 + 0.001 * i as f64))
            .collect();
        let result =
            BacktestResult::from_run("test".into(), 10_000.0, 0.0, vec![], make_curve(&values));
        assert!(result.sharpe_ratio > 0.0);
    }

    #[test]
    fn drawdown_tracks_peak_to_trough() {
        let curve = make_curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        let (dd, dd_pct) = max_drawdown(&curve);
        assert!((dd - 30.0).abs() < 1e-9);
        assert!((dd_pct - 30.0 / 110.0).abs() < 1e-9);
    }

    #[test]
    fn trade_stats_pairs_buys_and_sells() {
        let trades = vec![
            make_trade(OrderSide::Buy, 100.0, 1.0),
            make_trade(OrderSide::Sell, 110.0, 1.0), // +10 win
            make_trade(OrderSide::Buy, 100.0, 2.0),
            make_trade(OrderSide::Sell, 95.0, 2.0), // -10 loss
            make_trade(OrderSide::Buy, 100.0, 1.0),
            make_trade(OrderSide::Sell, 100.0, 1.0), // flat, ignored
        ];
        let (wins, losses, win_rate) = trade_stats(&trades);
        assert_eq!(wins, 1);
        assert_eq!(losses, 1);
        assert!((win_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn unpaired_sell_is_ignored() {
        let trades = vec![make_trade(OrderSide::Sell, 110.0, 1.0)];
        let (wins, losses, win_rate) = trade_stats(&trades);
        assert_eq!(wins, 0);
        assert_eq!(losses, 0);
        assert_eq!(win_rate, 0.0);
    }

    #[test]
    fn dangling_buy_counts_no_pair() {
        let trades = vec![
            make_trade(OrderSide::Buy, 100.0, 1.0),
            make_trade(OrderSide::Sell, 90.0, 1.0),
            make_trade(OrderSide::Buy, 100.0, 1.0), // never closed
        ];
        let (wins, losses, _) = trade_stats(&trades);
        assert_eq!(wins, 0);
        assert_eq!(losses, 1);
    }

    #[test]
    fn sharpe_uses_curve_span_for_annualization() {
        // Hourly curve over ~4 days with alternating returns.
        let mut values = Vec::new();
        let mut equity = 10_000.0;
        for i in 0..100 {
            equity *= if i % 2 == 0 { 1.002 } else { 0.999 };
            values.push(equity);
        }
        let curve = make_curve(&values);
        let value = sharpe(&curve, curve[0].timestamp, curve[curve.len() - 1].timestamp);
        assert!(value.is_finite());
        assert!(value > 0.0);
    }

    #[test]
    fn zero_span_curve_has_zero_sharpe() {
        let mut curve = make_curve(&[100.0, 105.0]);
        curve[1].timestamp = curve[0].timestamp;
        let value = sharpe(&curve, curve[0].timestamp, curve[1].timestamp);
        assert_eq!(value, 0.0);
    }

    #[test]
    fn result_serializes_to_json() {
        let result = BacktestResult::from_run(
            "MA_Cross_5_20".into(),
            10_000.0,
            0.0,
            vec![],
            make_curve(&[10_000.0, 10_100.0]),
        );
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("MA_Cross_5_20"));
        let back: BacktestResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
