//! Binance REST kline provider.
//!
//! Talks to `GET /api/v3/klines`, which returns a JSON array of arrays:
//! `[openTime, open, high, low, close, volume, closeTime, ...]` with the
//! decimal fields encoded as strings. Only public market data is used, so
//! no credentials are required.

use crate::domain::error::QuantError;
use crate::ports::kline_provider::{KlineProvider, RawKline};
use crate::ports::config_port::ConfigPort;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

pub struct BinanceProvider {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl BinanceProvider {
    pub fn new(base_url: &str) -> Self {
        BinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn from_config(config: &dyn ConfigPort) -> Self {
        let base_url = config
            .get_string("exchange", "base_url")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::new(&base_url)
    }
}

fn upstream_err(err: impl std::fmt::Display) -> QuantError {
    QuantError::Upstream {
        reason: err.to_string(),
    }
}

/// Pull the kline array fields out of one JSON row.
fn parse_kline(row: &Value) -> Result<RawKline, QuantError> {
    let fields = row
        .as_array()
        .ok_or_else(|| upstream_err("kline row is not an array"))?;
    if fields.len() < 7 {
        return Err(upstream_err(format!(
            "kline row has {} fields, expected at least 7",
            fields.len()
        )));
    }

    let int_field = |index: usize| -> Result<i64, QuantError> {
        fields[index]
            .as_i64()
            .ok_or_else(|| upstream_err(format!("kline field {index} is not an integer")))
    };
    let string_field = |index: usize| -> Result<String, QuantError> {
        match &fields[index] {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(upstream_err(format!(
                "kline field {index} has unexpected type: {other}"
            ))),
        }
    };

    Ok(RawKline {
        open_ms: int_field(0)?,
        open: string_field(1)?,
        high: string_field(2)?,
        low: string_field(3)?,
        close: string_field(4)?,
        volume: string_field(5)?,
        close_ms: int_field(6)?,
    })
}

impl KlineProvider for BinanceProvider {
    fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: i64,
        end_ms: i64,
        limit: usize,
    ) -> Result<Vec<RawKline>, QuantError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let start_ms = start_ms.to_string();
        let end_ms = end_ms.to_string();
        let limit = limit.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol),
                ("interval", interval),
                ("startTime", start_ms.as_str()),
                ("endTime", end_ms.as_str()),
                ("limit", limit.as_str()),
            ])
            .send()
            .map_err(upstream_err)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(upstream_err(format!(
                "klines request failed with {status}: {body}"
            )));
        }

        let rows: Vec<Value> = response.json().map_err(upstream_err)?;
        rows.iter().map(parse_kline).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_wire_format_row() {
        let row = json!([
            1700000000000_i64,
            "37000.10",
            "37100.00",
            "36900.50",
            "37050.25",
            "123.456",
            1700003599999_i64,
            "4572102.1",
            950,
            "60.0",
            "2223651.5",
            "0"
        ]);

        let kline = parse_kline(&row).unwrap();
        assert_eq!(kline.open_ms, 1_700_000_000_000);
        assert_eq!(kline.close_ms, 1_700_003_599_999);
        assert_eq!(kline.open, "37000.10");
        assert_eq!(kline.close, "37050.25");
        assert_eq!(kline.volume, "123.456");
    }

    #[test]
    fn accepts_numeric_price_fields() {
        let row = json!([0_i64, 100.5, 101, 99.5, 100, 12, 3599999_i64]);
        let kline = parse_kline(&row).unwrap();
        assert_eq!(kline.open, "100.5");
        assert_eq!(kline.high, "101");
    }

    #[test]
    fn rejects_short_rows() {
        let row = json!([0_i64, "1", "2"]);
        assert!(parse_kline(&row).is_err());
    }

    #[test]
    fn rejects_non_array_rows() {
        let row = json!({"open": "1"});
        assert!(parse_kline(&row).is_err());
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let provider = BinanceProvider::new("https://api.binance.com/");
        assert_eq!(provider.base_url, "https://api.binance.com");
    }
}
