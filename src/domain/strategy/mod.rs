//! Strategy interface, reference implementations, and registry.
//!
//! A strategy consumes candles one at a time in chronological order and may
//! emit buy/sell signals. Strategies own their trailing observation window
//! and their Flat/Long state; they cannot query the engine, so they must not
//! emit a signal that would violate the state transition (no Sell while
//! flat).

pub mod bb_rsi;
pub mod dca;
pub mod golden_rsi_bb;
pub mod ma_cross;
pub mod rsi;

pub use bb_rsi::BbRsiStrategy;
pub use dca::DcaStrategy;
pub use golden_rsi_bb::GoldenRsiBbStrategy;
pub use ma_cross::MaCrossStrategy;
pub use rsi::RsiStrategy;

use crate::domain::candle::Candle;
use crate::domain::error::QuantError;
use crate::domain::order::OrderSide;
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// A trading signal for the current candle.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    pub action: OrderSide,
    pub quantity: f64,
    /// Limit price; 0 means market-order-at-close.
    pub price: f64,
    pub reason: String,
}

/// Stateful signal generator.
pub trait Strategy {
    /// Reset all internal state. Idempotent.
    fn initialize(&mut self);

    /// Consume one candle; may return a signal.
    fn on_candle(&mut self, candle: &Candle) -> Result<Option<Signal>, QuantError>;

    /// Deterministic label encoding the parameters.
    fn name(&self) -> String;
}

fn default_fast_period() -> usize {
    10
}
fn default_slow_period() -> usize {
    30
}
fn default_rsi_period() -> usize {
    14
}
fn default_oversold() -> f64 {
    30.0
}
fn default_overbought() -> f64 {
    70.0
}
fn default_bb_period() -> usize {
    20
}
fn default_bb_multiplier() -> f64 {
    2.0
}
fn default_position_size() -> f64 {
    0.01
}
fn default_dca_period_hours() -> i64 {
    24
}
fn default_dca_amount() -> f64 {
    100.0
}

/// Strategy selection plus parameters, as carried in request payloads and
/// persisted alongside backtest results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub strategy: String,

    #[serde(default = "default_fast_period")]
    pub fast_period: usize,
    #[serde(default = "default_slow_period")]
    pub slow_period: usize,

    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_oversold")]
    pub oversold: f64,
    #[serde(default = "default_overbought")]
    pub overbought: f64,

    #[serde(default = "default_bb_period")]
    pub bb_period: usize,
    #[serde(default = "default_bb_multiplier")]
    pub bb_multiplier: f64,

    #[serde(default = "default_position_size")]
    pub position_size: f64,

    #[serde(default = "default_dca_period_hours")]
    pub dca_period_hours: i64,
    #[serde(default = "default_dca_amount")]
    pub dca_amount: f64,
}

impl StrategyConfig {
    pub fn named(strategy: &str) -> Self {
        serde_json::from_value(serde_json::json!({ "strategy": strategy }))
            .expect("defaulted config always deserializes")
    }
}

/// Construct a strategy from its registry name.
pub fn build_strategy(config: &StrategyConfig) -> Result<Box<dyn Strategy>, QuantError> {
    match config.strategy.as_str() {
        "ma_cross" => Ok(Box::new(MaCrossStrategy::new(
            config.fast_period,
            config.slow_period,
        ))),
        "rsi" => Ok(Box::new(RsiStrategy::new(
            config.rsi_period,
            config.oversold,
            config.overbought,
            config.position_size,
        ))),
        "bb_rsi" => Ok(Box::new(BbRsiStrategy::new(
            config.bb_period,
            config.bb_multiplier,
            config.rsi_period,
            config.oversold,
            config.overbought,
            config.position_size,
        ))),
        "dca" => Ok(Box::new(DcaStrategy::new(
            Duration::hours(config.dca_period_hours),
            config.dca_amount,
        ))),
        "golden_rsi_bb" => Ok(Box::new(GoldenRsiBbStrategy::new(config.position_size))),
        other => Err(QuantError::Validation {
            reason: format!(
                "unknown strategy: {other}. Available: ma_cross, rsi, bb_rsi, dca, golden_rsi_bb"
            ),
        }),
    }
}
