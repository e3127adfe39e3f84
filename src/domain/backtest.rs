//! Backtest engine: deterministic replay of a candle stream through a
//! strategy, with settlement, ledger recording, and equity sampling.
//!
//! The loop is single-threaded and fully synchronous. Settlement failures
//! (insufficient balance, position shortfall) are expected symptoms of
//! strategy misconfiguration: they are logged and skipped without touching
//! the ledger. Strategy errors abort the run. The engine reads no wall
//! clock and holds no shared state, so identical inputs produce identical
//! trade ledgers and equity curves.

use crate::domain::cancel::CancelToken;
use crate::domain::candle::Candle;
use crate::domain::error::QuantError;
use crate::domain::metrics::BacktestResult;
use crate::domain::order::OrderSide;
use crate::domain::strategy::{Signal, Strategy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// One settled fill in the engine's ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrade {
    pub timestamp: DateTime<Utc>,
    pub side: OrderSide,
    /// Unit price of the fill; the fee is recorded separately and the
    /// balance reflects the net.
    pub price: f64,
    pub quantity: f64,
    pub fee: f64,
    pub balance: f64,
    pub position: f64,
    pub reason: String,
}

/// Equity sampled once per candle: cash plus mark-to-market position value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    pub price: f64,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub initial_balance: f64,
    /// Commission rate, e.g. 0.001 for 0.1%.
    pub commission: f64,
}

/// Backtest engine. Owns its balance, position, ledger, and equity curve
/// for the duration of a run; these are disposable outputs.
pub struct Engine {
    initial_balance: f64,
    commission: f64,

    balance: f64,
    position: f64,
    trades: Vec<BacktestTrade>,
    equity: Vec<EquityPoint>,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Self {
        Engine {
            initial_balance: config.initial_balance,
            commission: config.commission,
            balance: config.initial_balance,
            position: 0.0,
            trades: Vec::new(),
            equity: Vec::new(),
        }
    }

    /// Replay `candles` through `strategy`.
    ///
    /// The cancel token is checked between candles; on cancellation the
    /// run returns the partial result accumulated so far.
    pub fn run(
        &mut self,
        strategy: &mut dyn Strategy,
        candles: &[Candle],
        cancel: &CancelToken,
    ) -> Result<BacktestResult, QuantError> {
        info!(
            candles = candles.len(),
            initial_balance = self.initial_balance,
            commission = self.commission,
            strategy = %strategy.name(),
            "starting backtest"
        );

        strategy.initialize();
        self.balance = self.initial_balance;
        self.position = 0.0;
        self.trades.clear();
        self.equity.clear();

        for (index, candle) in candles.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(index, "backtest cancelled");
                break;
            }

            let signal = strategy
                .on_candle(candle)
                .map_err(|err| QuantError::Strategy {
                    index,
                    reason: err.to_string(),
                })?;

            if let Some(signal) = signal {
                if let Err(err) = self.execute_signal(candle, &signal) {
                    warn!(index, error = %err, "failed to execute signal");
                }
            }

            self.equity.push(EquityPoint {
                timestamp: candle.open_time,
                equity: self.balance + self.position * candle.close,
                price: candle.close,
            });
        }

        let result = BacktestResult::from_run(
            strategy.name(),
            self.initial_balance,
            self.balance,
            self.trades.clone(),
            self.equity.clone(),
        );

        info!(
            final_equity = result.final_equity,
            total_return = result.total_return,
            trades = result.total_trades,
            "backtest complete"
        );

        Ok(result)
    }

    fn execute_signal(&mut self, candle: &Candle, signal: &Signal) -> Result<(), QuantError> {
        // Market orders fill at the candle close.
        let price = if signal.price > 0.0 {
            signal.price
        } else {
            candle.close
        };

        match signal.action {
            OrderSide::Buy => {
                self.execute_buy(candle.open_time, price, signal.quantity, &signal.reason)
            }
            OrderSide::Sell => {
                self.execute_sell(candle.open_time, price, signal.quantity, &signal.reason)
            }
        }
    }

    fn execute_buy(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        quantity: f64,
        reason: &str,
    ) -> Result<(), QuantError> {
        let cost = price * quantity;
        let fee = cost * self.commission;
        let total_cost = cost + fee;

        if total_cost > self.balance {
            return Err(QuantError::InsufficientFree {
                asset: "quote".into(),
                have: self.balance,
                need: total_cost,
            });
        }

        self.balance -= total_cost;
        self.position += quantity;

        self.trades.push(BacktestTrade {
            timestamp,
            side: OrderSide::Buy,
            price,
            quantity,
            fee,
            balance: self.balance,
            position: self.position,
            reason: reason.to_string(),
        });

        debug!(
            quantity,
            price,
            fee,
            balance = self.balance,
            position = self.position,
            reason,
            "BUY"
        );

        Ok(())
    }

    fn execute_sell(
        &mut self,
        timestamp: DateTime<Utc>,
        price: f64,
        quantity: f64,
        reason: &str,
    ) -> Result<(), QuantError> {
        if quantity > self.position {
            return Err(QuantError::PositionShortfall {
                have: self.position,
                need: quantity,
            });
        }

        let revenue = price * quantity;
        let fee = revenue * self.commission;

        self.balance += revenue - fee;
        self.position -= quantity;

        self.trades.push(BacktestTrade {
            timestamp,
            side: OrderSide::Sell,
            price,
            quantity,
            fee,
            balance: self.balance,
            position: self.position,
            reason: reason.to_string(),
        });

        debug!(
            quantity,
            price,
            fee,
            balance = self.balance,
            position = self.position,
            reason,
            "SELL"
        );

        Ok(())
    }
}
