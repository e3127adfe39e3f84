//! Technical indicator library.
//!
//! Pure functions over a trailing price series (most recent element at the
//! end). All are stateless and restartable; strategies call them on their
//! own accumulated history each candle.

pub mod bollinger;
pub mod ma;
pub mod macd;
pub mod rsi;

pub use bollinger::{bollinger_bands, standard_bollinger_bands, BollingerBands};
pub use ma::{ema, sma, vwma};
pub use macd::{macd, standard_macd, Macd};
pub use rsi::{rsi, stochastic_rsi};
