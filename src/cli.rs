//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::binance_provider::BinanceProvider;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite_store::SqliteStore;
use crate::domain::backtest::{Engine, EngineConfig};
use crate::domain::cancel::CancelToken;
use crate::domain::candle::Interval;
use crate::domain::collector::Collector;
use crate::domain::config_validation::validate_config;
use crate::domain::error::QuantError;
use crate::domain::metrics::BacktestResult;
use crate::domain::strategy::{build_strategy, StrategyConfig};
use crate::ports::candle_store::CandleStore;
use crate::ports::config_port::ConfigPort;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};

#[derive(Parser, Debug)]
#[command(name = "quantrader", about = "Crypto quantitative trading research platform")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Collect historical candles from the exchange into the local store
    Ingest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value = "BTCUSDT")]
        symbol: String,
        #[arg(long, default_value = "1h")]
        interval: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// End date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        end: Option<String>,
    },
    /// Replay stored candles through a strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value = "BTCUSDT")]
        symbol: String,
        #[arg(long, default_value = "1h")]
        interval: String,
        #[arg(long)]
        start: String,
        #[arg(long)]
        end: Option<String>,
        /// Strategy name: ma_cross, rsi, bb_rsi, dca, golden_rsi_bb
        #[arg(long, default_value = "ma_cross")]
        strategy: String,
        /// Strategy parameters as JSON, merged over the defaults
        #[arg(long)]
        params: Option<String>,
        #[arg(long)]
        balance: Option<f64>,
        #[arg(long)]
        commission: Option<f64>,
        /// Persist the summary row to the store
        #[arg(long)]
        save: bool,
    },
    /// Show stored data range for a symbol
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long, default_value = "BTCUSDT")]
        symbol: String,
        #[arg(long, default_value = "1h")]
        interval: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Ingest {
            config,
            symbol,
            interval,
            start,
            end,
        } => run_ingest(&config, &symbol, &interval, &start, end.as_deref()),
        Command::Backtest {
            config,
            symbol,
            interval,
            start,
            end,
            strategy,
            params,
            balance,
            commission,
            save,
        } => run_backtest(
            &config,
            &symbol,
            &interval,
            &start,
            end.as_deref(),
            &strategy,
            params.as_deref(),
            balance,
            commission,
            save,
        ),
        Command::Info {
            config,
            symbol,
            interval,
        } => run_info(&config, &symbol, &interval),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            (&err).into()
        }
    }
}

fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, QuantError> {
    let adapter = FileConfigAdapter::from_file(path).map_err(|e| QuantError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })?;
    validate_config(&adapter)?;
    Ok(adapter)
}

fn open_store(config: &dyn ConfigPort) -> Result<SqliteStore, QuantError> {
    let store = SqliteStore::from_config(config)?;
    store.migrate()?;
    Ok(store)
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, QuantError> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| QuantError::Validation {
        reason: format!("invalid date {value:?}: {e}"),
    })?;
    Ok(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).expect("midnight is valid")))
}

fn parse_window(
    start: &str,
    end: Option<&str>,
) -> Result<(DateTime<Utc>, DateTime<Utc>), QuantError> {
    let start = parse_date(start)?;
    let end = match end {
        Some(value) => parse_date(value)?,
        None => Utc::now(),
    };
    if start >= end {
        return Err(QuantError::Validation {
            reason: format!("start {start} is not before end {end}"),
        });
    }
    Ok((start, end))
}

fn run_ingest(
    config_path: &PathBuf,
    symbol: &str,
    interval: &str,
    start: &str,
    end: Option<&str>,
) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let provider = BinanceProvider::from_config(&config);

    let interval: Interval = interval.parse()?;
    let (start, end) = parse_window(start, end)?;

    let total = Collector::new(&provider, &store).collect(
        symbol,
        interval,
        start,
        end,
        &CancelToken::new(),
    )?;

    eprintln!("ingested {total} candles for {symbol} ({interval})");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_backtest(
    config_path: &PathBuf,
    symbol: &str,
    interval: &str,
    start: &str,
    end: Option<&str>,
    strategy_name: &str,
    params: Option<&str>,
    balance: Option<f64>,
    commission: Option<f64>,
    save: bool,
) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;

    let interval: Interval = interval.parse()?;
    let (start, end) = parse_window(start, end)?;

    // Fill the store when it has no coverage for the window.
    let latest = store.get_latest(symbol, interval)?;
    if latest.map(|c| c.open_time < start).unwrap_or(true) {
        eprintln!("no stored data covering the window; ingesting first");
        let provider = BinanceProvider::from_config(&config);
        Collector::new(&provider, &store).collect(
            symbol,
            interval,
            start,
            end,
            &CancelToken::new(),
        )?;
    }

    let candles = store.get_range(symbol, interval, start, end)?;
    if candles.is_empty() {
        return Err(QuantError::Validation {
            reason: format!("no candles stored for {symbol} ({interval}) in the requested window"),
        });
    }
    eprintln!("loaded {} candles", candles.len());

    let strategy_config = build_strategy_config(strategy_name, params)?;
    let mut strategy = build_strategy(&strategy_config)?;

    let engine_config = EngineConfig {
        initial_balance: balance
            .unwrap_or_else(|| config.get_double("backtest", "initial_balance", 10_000.0)),
        commission: commission
            .unwrap_or_else(|| config.get_double("backtest", "commission", 0.001)),
    };

    let mut engine = Engine::new(&engine_config);
    let result = engine.run(strategy.as_mut(), &candles, &CancelToken::new())?;

    print_result(&result);

    if save {
        let config_json =
            serde_json::to_string(&strategy_config).map_err(|e| QuantError::Validation {
                reason: format!("cannot serialize strategy config: {e}"),
            })?;
        store.save_backtest_result(symbol, &result, &config_json)?;
        eprintln!("result saved");
    }

    Ok(())
}

fn build_strategy_config(name: &str, params: Option<&str>) -> Result<StrategyConfig, QuantError> {
    let mut value = serde_json::json!({ "strategy": name });
    if let Some(params) = params {
        let overrides: serde_json::Value =
            serde_json::from_str(params).map_err(|e| QuantError::Validation {
                reason: format!("invalid --params JSON: {e}"),
            })?;
        let map = value.as_object_mut().expect("strategy config is an object");
        match overrides {
            serde_json::Value::Object(overrides) => {
                for (key, val) in overrides {
                    map.insert(key, val);
                }
            }
            _ => {
                return Err(QuantError::Validation {
                    reason: "--params must be a JSON object".into(),
                })
            }
        }
    }

    serde_json::from_value(value).map_err(|e| QuantError::Validation {
        reason: format!("invalid strategy parameters: {e}"),
    })
}

fn print_result(result: &BacktestResult) {
    println!("========== Backtest Results ==========");
    println!("Strategy:         {}", result.strategy_name);
    if let (Some(start), Some(end)) = (result.start_time, result.end_time) {
        println!("Period:           {start} .. {end}");
    }
    println!("Initial Balance:  {:.2}", result.initial_balance);
    println!("Final Equity:     {:.2}", result.final_equity);
    println!("Total Return:     {:.2}%", result.total_return * 100.0);
    println!("Sharpe Ratio:     {:.2}", result.sharpe_ratio);
    println!(
        "Max Drawdown:     {:.2} ({:.2}%)",
        result.max_drawdown,
        result.max_drawdown_pct * 100.0
    );
    println!("Total Trades:     {}", result.total_trades);
    println!("Winning Trades:   {}", result.winning_trades);
    println!("Losing Trades:    {}", result.losing_trades);
    println!("Win Rate:         {:.2}%", result.win_rate * 100.0);
    println!("======================================");
}

fn run_info(config_path: &PathBuf, symbol: &str, interval: &str) -> Result<(), QuantError> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let interval: Interval = interval.parse()?;

    match (
        store.get_first(symbol, interval)?,
        store.get_latest(symbol, interval)?,
    ) {
        (Some(first), Some(latest)) => {
            println!(
                "{symbol} ({interval}): {} .. {}",
                first.open_time, latest.open_time
            );
        }
        _ => println!("{symbol} ({interval}): no data"),
    }

    Ok(())
}
