//! Port traits the domain consumes; implemented in [`crate::adapters`].

pub mod candle_store;
pub mod config_port;
pub mod kline_provider;

pub use candle_store::CandleStore;
pub use config_port::ConfigPort;
pub use kline_provider::{KlineProvider, RawKline};
