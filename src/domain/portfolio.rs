//! Per-symbol position tracking with realized / unrealized PnL.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

/// A tracked position. `quantity` is signed: positive long, negative short.
///
/// When `quantity` is 0 the position is flat: `unrealized_pnl` is 0 and
/// `avg_entry_price` must not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub avg_entry_price: f64,
    pub current_price: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
    pub updated_at: DateTime<Utc>,
}

/// Position book. Readers take the shared lock, `update_*` the exclusive one.
#[derive(Debug, Default)]
pub struct Portfolio {
    positions: RwLock<HashMap<String, Position>>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// The open position for `symbol`, if any. Flat positions are reported
    /// as absent even when a record exists (it may still carry realized PnL).
    pub fn position(&self, symbol: &str) -> Option<Position> {
        let positions = self.positions.read().expect("portfolio lock poisoned");
        positions
            .get(symbol)
            .filter(|p| p.quantity != 0.0)
            .cloned()
    }

    pub fn all_positions(&self) -> Vec<Position> {
        let positions = self.positions.read().expect("portfolio lock poisoned");
        let mut all: Vec<Position> = positions.values().cloned().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        all
    }

    /// Apply a signed quantity delta at an execution price.
    ///
    /// Classifies the delta against the prior quantity: open, add,
    /// partial close, full close, or flip. Closing legs realize
    /// `(exec_price - avg_entry) * closed_qty`.
    pub fn update_position(&self, symbol: &str, quantity: f64, price: f64) {
        let mut positions = self.positions.write().expect("portfolio lock poisoned");

        let pos = positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position {
                symbol: symbol.to_string(),
                quantity: 0.0,
                avg_entry_price: 0.0,
                current_price: price,
                unrealized_pnl: 0.0,
                realized_pnl: 0.0,
                updated_at: Utc::now(),
            });

        let old_qty = pos.quantity;
        let new_qty = old_qty + quantity;

        if old_qty == 0.0 {
            // Open
            pos.avg_entry_price = price;
            pos.quantity = new_qty;
        } else if (old_qty > 0.0 && quantity > 0.0) || (old_qty < 0.0 && quantity < 0.0) {
            // Add: blend the entry price by size
            let total_cost = pos.avg_entry_price * old_qty + price * quantity;
            pos.avg_entry_price = total_cost / new_qty;
            pos.quantity = new_qty;
        } else if new_qty == 0.0 {
            // Full close
            pos.realized_pnl += (price - pos.avg_entry_price) * (-quantity);
            pos.quantity = 0.0;
            pos.unrealized_pnl = 0.0;
        } else if (old_qty > 0.0 && new_qty > 0.0) || (old_qty < 0.0 && new_qty < 0.0) {
            // Partial close
            pos.realized_pnl += (price - pos.avg_entry_price) * (-quantity);
            pos.quantity = new_qty;
        } else {
            // Flip: realize on the leg that closed, re-open at the exec price
            pos.realized_pnl += (price - pos.avg_entry_price) * old_qty;
            pos.avg_entry_price = price;
            pos.quantity = new_qty;
        }

        pos.current_price = price;
        pos.updated_at = Utc::now();
    }

    /// Refresh mark price and unrealized PnL for all open positions.
    pub fn update_prices(&self, prices: &HashMap<String, f64>) {
        let mut positions = self.positions.write().expect("portfolio lock poisoned");

        for (symbol, pos) in positions.iter_mut() {
            if pos.quantity == 0.0 {
                continue;
            }
            if let Some(&price) = prices.get(symbol) {
                pos.current_price = price;
                pos.unrealized_pnl = (price - pos.avg_entry_price) * pos.quantity;
                pos.updated_at = Utc::now();
            }
        }
    }

    /// Sum of (unrealized, realized) PnL across all tracked symbols.
    pub fn total_pnl(&self) -> (f64, f64) {
        let positions = self.positions.read().expect("portfolio lock poisoned");
        positions.values().fold((0.0, 0.0), |(u, r), pos| {
            (u + pos.unrealized_pnl, r + pos.realized_pnl)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_long() {
        let portfolio = Portfolio::new();
        portfolio.update_position("BTCUSDT", 1.0, 100.0);

        let pos = portfolio.position("BTCUSDT").unwrap();
        assert_eq!(pos.quantity, 1.0);
        assert_eq!(pos.avg_entry_price, 100.0);
        assert_eq!(pos.realized_pnl, 0.0);
    }

    #[test]
    fn flat_symbol_reports_absent() {
        let portfolio = Portfolio::new();
        assert!(portfolio.position("BTCUSDT").is_none());

        portfolio.update_position("BTCUSDT", 1.0, 100.0);
        portfolio.update_position("BTCUSDT", -1.0, 110.0);
        assert!(portfolio.position("BTCUSDT").is_none());
    }

    #[test]
    fn add_blends_entry_price() {
        let portfolio = Portfolio::new();
        portfolio.update_position("BTCUSDT", 1.0, 100.0);
        portfolio.update_position("BTCUSDT", 1.0, 120.0);

        let pos = portfolio.position("BTCUSDT").unwrap();
        assert_eq!(pos.quantity, 2.0);
        assert!((pos.avg_entry_price - 110.0).abs() < 1e-9);
    }

    #[test]
    fn full_close_realizes_pnl_and_zeroes_unrealized() {
        let portfolio = Portfolio::new();
        portfolio.update_position("BTCUSDT", 2.0, 100.0);
        portfolio.update_position("BTCUSDT", -2.0, 110.0);

        let all = portfolio.all_positions();
        assert_eq!(all.len(), 1);
        let pos = &all[0];
        assert_eq!(pos.quantity, 0.0);
        assert_eq!(pos.unrealized_pnl, 0.0);
        assert!((pos.realized_pnl - 20.0).abs() < 1e-9);
    }

    #[test]
    fn partial_close_realizes_closed_leg() {
        let portfolio = Portfolio::new();
        portfolio.update_position("BTCUSDT", 3.0, 100.0);
        portfolio.update_position("BTCUSDT", -1.0, 130.0);

        let pos = portfolio.position("BTCUSDT").unwrap();
        assert_eq!(pos.quantity, 2.0);
        assert!((pos.avg_entry_price - 100.0).abs() < 1e-9);
        assert!((pos.realized_pnl - 30.0).abs() < 1e-9);
    }

    #[test]
    fn reversal_realizes_old_leg_and_reopens() {
        let portfolio = Portfolio::new();
        portfolio.update_position("BTCUSDT", 1.0, 100.0);
        portfolio.update_position("BTCUSDT", -3.0, 120.0);

        let pos = portfolio.position("BTCUSDT").unwrap();
        assert_eq!(pos.quantity, -2.0);
        assert!((pos.avg_entry_price - 120.0).abs() < 1e-9);
        // Closed the 1-lot long for +20.
        assert!((pos.realized_pnl - 20.0).abs() < 1e-9);
    }

    #[test]
    fn update_prices_refreshes_unrealized() {
        let portfolio = Portfolio::new();
        portfolio.update_position("BTCUSDT", 2.0, 100.0);

        let prices = HashMap::from([("BTCUSDT".to_string(), 105.0)]);
        portfolio.update_prices(&prices);

        let pos = portfolio.position("BTCUSDT").unwrap();
        assert_eq!(pos.current_price, 105.0);
        assert!((pos.unrealized_pnl - 10.0).abs() < 1e-9);
    }

    #[test]
    fn update_prices_skips_flat_positions() {
        let portfolio = Portfolio::new();
        portfolio.update_position("BTCUSDT", 1.0, 100.0);
        portfolio.update_position("BTCUSDT", -1.0, 100.0);

        let prices = HashMap::from([("BTCUSDT".to_string(), 500.0)]);
        portfolio.update_prices(&prices);

        let all = portfolio.all_positions();
        assert_eq!(all[0].unrealized_pnl, 0.0);
    }

    #[test]
    fn total_pnl_sums_across_symbols() {
        let portfolio = Portfolio::new();
        portfolio.update_position("BTCUSDT", 1.0, 100.0);
        portfolio.update_position("BTCUSDT", -1.0, 110.0);
        portfolio.update_position("ETHUSDT", 2.0, 50.0);

        let prices = HashMap::from([("ETHUSDT".to_string(), 55.0)]);
        portfolio.update_prices(&prices);

        let (unrealized, realized) = portfolio.total_pnl();
        assert!((unrealized - 10.0).abs() < 1e-9);
        assert!((realized - 10.0).abs() < 1e-9);
    }

    #[test]
    fn close_from_short_realizes_inverse() {
        let portfolio = Portfolio::new();
        portfolio.update_position("BTCUSDT", -2.0, 100.0);
        portfolio.update_position("BTCUSDT", 2.0, 90.0);

        let all = portfolio.all_positions();
        // Short closed 10 below entry: (90 - 100) * -2 = +20.
        assert!((all[0].realized_pnl - 20.0).abs() < 1e-9);
    }
}
