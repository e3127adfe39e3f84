//! Concrete adapter implementations for ports.

pub mod binance_provider;
pub mod file_config_adapter;
pub mod sqlite_store;

pub use binance_provider::BinanceProvider;
pub use file_config_adapter::FileConfigAdapter;
pub use sqlite_store::SqliteStore;
