//! SQLite persistence adapter.
//!
//! One candle table per interval keeps the indexes small and drops the
//! interval column from the query path. Every pooled connection enables
//! WAL and foreign-key enforcement on open; the concurrency model is
//! multi-reader / single-writer within the process. Times are stored as
//! Unix-epoch seconds.

use crate::domain::candle::{Candle, Interval};
use crate::domain::error::QuantError;
use crate::domain::metrics::BacktestResult;
use crate::domain::order::Trade;
use crate::ports::candle_store::CandleStore;
use crate::ports::config_port::ConfigPort;
use chrono::{DateTime, TimeZone, Utc};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::info;

pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

fn storage_err(err: impl std::fmt::Display) -> QuantError {
    QuantError::Storage {
        reason: err.to_string(),
    }
}

fn candle_table(interval: Interval) -> String {
    format!("candles_{}", interval.as_str())
}

impl SqliteStore {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, QuantError> {
        let db_path = config
            .get_string("database", "path")
            .ok_or_else(|| QuantError::ConfigMissing {
                section: "database".into(),
                key: "path".into(),
            })?;

        if let Some(dir) = std::path::Path::new(&db_path).parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        let pool_size = config.get_int("database", "pool_size", 4) as u32;
        let manager = SqliteConnectionManager::file(&db_path).with_init(init_connection);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(storage_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, QuantError> {
        let manager = SqliteConnectionManager::memory().with_init(init_connection);
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(storage_err)?;

        Ok(Self { pool })
    }

    /// Create all tables and indexes.
    pub fn migrate(&self) -> Result<(), QuantError> {
        let conn = self.pool.get().map_err(storage_err)?;

        for interval in Interval::ALL {
            let table = candle_table(interval);
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    symbol TEXT NOT NULL,
                    open_time INTEGER NOT NULL,
                    close_time INTEGER NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume REAL NOT NULL,
                    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                    UNIQUE(symbol, open_time)
                );
                CREATE INDEX IF NOT EXISTS idx_{table}_symbol_time
                    ON {table}(symbol, open_time DESC);"
            ))
            .map_err(storage_err)?;
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                order_id TEXT NOT NULL,
                symbol TEXT NOT NULL,
                side TEXT NOT NULL,
                price REAL NOT NULL,
                quantity REAL NOT NULL,
                fee REAL NOT NULL,
                fee_asset TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_trades_symbol_timestamp
                ON trades(symbol, timestamp DESC);

            CREATE TABLE IF NOT EXISTS backtest_results (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                strategy_name TEXT NOT NULL,
                symbol TEXT NOT NULL,
                start_time INTEGER NOT NULL,
                end_time INTEGER NOT NULL,
                initial_balance REAL NOT NULL,
                final_balance REAL NOT NULL,
                total_return REAL NOT NULL,
                sharpe_ratio REAL,
                max_drawdown REAL,
                win_rate REAL,
                total_trades INTEGER NOT NULL,
                config TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_backtest_strategy
                ON backtest_results(strategy_name, created_at DESC);",
        )
        .map_err(storage_err)?;

        info!("database migrations complete");
        Ok(())
    }

    /// Persist one trade-ledger row.
    pub fn save_trade(&self, trade: &Trade) -> Result<(), QuantError> {
        let conn = self.pool.get().map_err(storage_err)?;
        conn.execute(
            "INSERT INTO trades (order_id, symbol, side, price, quantity, fee, fee_asset, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                trade.order_id,
                trade.symbol,
                trade.side.as_str(),
                trade.price,
                trade.quantity,
                trade.fee,
                trade.fee_asset,
                trade.timestamp.timestamp(),
            ],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    /// All trades for a symbol, most recent first.
    pub fn trades_by_symbol(&self, symbol: &str) -> Result<Vec<Trade>, QuantError> {
        let conn = self.pool.get().map_err(storage_err)?;
        let mut stmt = conn
            .prepare(
                "SELECT id, order_id, symbol, side, price, quantity, fee, fee_asset, timestamp
                 FROM trades WHERE symbol = ?1 ORDER BY timestamp DESC",
            )
            .map_err(storage_err)?;

        let rows = stmt
            .query_map(params![symbol], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, f64>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, i64>(8)?,
                ))
            })
            .map_err(storage_err)?;

        let mut trades = Vec::new();
        for row in rows {
            let (id, order_id, symbol, side, price, quantity, fee, fee_asset, timestamp) =
                row.map_err(storage_err)?;
            trades.push(Trade {
                id: id.to_string(),
                order_id,
                symbol,
                side: side.parse()?,
                price,
                quantity,
                fee,
                fee_asset,
                timestamp: Utc
                    .timestamp_opt(timestamp, 0)
                    .single()
                    .ok_or_else(|| storage_err(format!("bad trade timestamp {timestamp}")))?,
            });
        }

        Ok(trades)
    }

    /// Persist a backtest summary row with its strategy config as JSON.
    pub fn save_backtest_result(
        &self,
        symbol: &str,
        result: &BacktestResult,
        config_json: &str,
    ) -> Result<(), QuantError> {
        let conn = self.pool.get().map_err(storage_err)?;
        conn.execute(
            "INSERT INTO backtest_results
                (strategy_name, symbol, start_time, end_time, initial_balance, final_balance,
                 total_return, sharpe_ratio, max_drawdown, win_rate, total_trades, config)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                result.strategy_name,
                symbol,
                result.start_time.map(|t| t.timestamp()).unwrap_or(0),
                result.end_time.map(|t| t.timestamp()).unwrap_or(0),
                result.initial_balance,
                result.final_equity,
                result.total_return,
                result.sharpe_ratio,
                result.max_drawdown,
                result.win_rate,
                result.total_trades as i64,
                config_json,
            ],
        )
        .map_err(storage_err)?;
        Ok(())
    }
}

fn init_connection(conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")
}

fn row_to_candle(row: &rusqlite::Row<'_>) -> Result<Candle, rusqlite::Error> {
    let open_time: i64 = row.get(1)?;
    let close_time: i64 = row.get(2)?;
    Ok(Candle {
        symbol: row.get(0)?,
        open_time: Utc.timestamp_opt(open_time, 0).single().ok_or(
            rusqlite::Error::IntegralValueOutOfRange(1, open_time),
        )?,
        close_time: Utc.timestamp_opt(close_time, 0).single().ok_or(
            rusqlite::Error::IntegralValueOutOfRange(2, close_time),
        )?,
        open: row.get(3)?,
        high: row.get(4)?,
        low: row.get(5)?,
        close: row.get(6)?,
        volume: row.get(7)?,
    })
}

const CANDLE_COLUMNS: &str = "symbol, open_time, close_time, open, high, low, close, volume";

impl CandleStore for SqliteStore {
    fn save(&self, candle: &Candle, interval: Interval) -> Result<(), QuantError> {
        let conn = self.pool.get().map_err(storage_err)?;
        let table = candle_table(interval);

        conn.execute(
            &format!(
                "INSERT INTO {table} ({CANDLE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(symbol, open_time) DO UPDATE SET
                     close_time = excluded.close_time,
                     open = excluded.open,
                     high = excluded.high,
                     low = excluded.low,
                     close = excluded.close,
                     volume = excluded.volume"
            ),
            params![
                candle.symbol,
                candle.open_time.timestamp(),
                candle.close_time.timestamp(),
                candle.open,
                candle.high,
                candle.low,
                candle.close,
                candle.volume,
            ],
        )
        .map_err(storage_err)?;

        Ok(())
    }

    fn save_batch(&self, candles: &[Candle], interval: Interval) -> Result<(), QuantError> {
        let mut conn = self.pool.get().map_err(storage_err)?;
        let table = candle_table(interval);

        let tx = conn.transaction().map_err(storage_err)?;
        {
            let mut stmt = tx
                .prepare(&format!(
                    "INSERT INTO {table} ({CANDLE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(symbol, open_time) DO UPDATE SET
                         close_time = excluded.close_time,
                         open = excluded.open,
                         high = excluded.high,
                         low = excluded.low,
                         close = excluded.close,
                         volume = excluded.volume"
                ))
                .map_err(storage_err)?;

            for candle in candles {
                stmt.execute(params![
                    candle.symbol,
                    candle.open_time.timestamp(),
                    candle.close_time.timestamp(),
                    candle.open,
                    candle.high,
                    candle.low,
                    candle.close,
                    candle.volume,
                ])
                .map_err(storage_err)?;
            }
        }
        tx.commit().map_err(storage_err)?;

        Ok(())
    }

    fn get_range(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Candle>, QuantError> {
        let conn = self.pool.get().map_err(storage_err)?;
        let table = candle_table(interval);

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CANDLE_COLUMNS} FROM {table}
                 WHERE symbol = ?1 AND open_time >= ?2 AND open_time < ?3
                 ORDER BY open_time ASC"
            ))
            .map_err(storage_err)?;

        let rows = stmt
            .query_map(
                params![symbol, start.timestamp(), end.timestamp()],
                row_to_candle,
            )
            .map_err(storage_err)?;

        let mut candles = Vec::new();
        for row in rows {
            candles.push(row.map_err(storage_err)?);
        }

        Ok(candles)
    }

    fn get_first(&self, symbol: &str, interval: Interval) -> Result<Option<Candle>, QuantError> {
        self.get_edge(symbol, interval, "ASC")
    }

    fn get_latest(&self, symbol: &str, interval: Interval) -> Result<Option<Candle>, QuantError> {
        self.get_edge(symbol, interval, "DESC")
    }
}

impl SqliteStore {
    fn get_edge(
        &self,
        symbol: &str,
        interval: Interval,
        order: &str,
    ) -> Result<Option<Candle>, QuantError> {
        let conn = self.pool.get().map_err(storage_err)?;
        let table = candle_table(interval);

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {CANDLE_COLUMNS} FROM {table}
                 WHERE symbol = ?1 ORDER BY open_time {order} LIMIT 1"
            ))
            .map_err(storage_err)?;

        let mut rows = stmt
            .query_map(params![symbol], row_to_candle)
            .map_err(storage_err)?;

        match rows.next() {
            Some(row) => Ok(Some(row.map_err(storage_err)?)),
            None => Ok(None),
        }
    }
}
