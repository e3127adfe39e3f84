//! Spot order settlement against the wallet and portfolio.
//!
//! A market order fills immediately at the caller-supplied price: the
//! required balance is locked, the fill is settled with a transfer between
//! the quote and base assets, the taker fee is debited from the quote
//! asset, and the position tracker is updated. Lock failures unwind before
//! anything settles. Only long spot flow is produced here; limit orders are
//! modeled but do not settle.

use crate::domain::error::QuantError;
use crate::domain::order::{Order, OrderSide, OrderStatus, OrderType};
use crate::domain::portfolio::Portfolio;
use crate::domain::wallet::Wallet;
use chrono::Utc;

/// Taker fee rate applied on settlement.
pub const FEE_RATE: f64 = 0.001;

/// Extra quote balance locked on buys to cover the fee.
pub const FEE_BUFFER: f64 = 1.001;

const QUOTE_ASSETS: [&str; 5] = ["USDT", "USDC", "BUSD", "BTC", "ETH"];

/// Split a symbol like `BTCUSDT` into `(base, quote)`.
pub fn split_symbol(symbol: &str) -> Result<(String, String), QuantError> {
    for quote in QUOTE_ASSETS {
        if let Some(base) = symbol.strip_suffix(quote) {
            if !base.is_empty() {
                return Ok((base.to_string(), quote.to_string()));
            }
        }
    }

    Err(QuantError::Validation {
        reason: format!("cannot split symbol into base/quote assets: {symbol}"),
    })
}

/// Fill a market order at `fill_price` and settle it.
///
/// Buy: locks `price*qty*FEE_BUFFER` of quote, transfers it into the base
/// asset, debits the fee from quote. Sell: locks `qty` of base, transfers
/// it into quote net of the fee. The portfolio's position for the symbol
/// is updated with the signed fill quantity.
pub fn place_market_order(
    wallet: &Wallet,
    portfolio: &Portfolio,
    symbol: &str,
    side: OrderSide,
    quantity: f64,
    fill_price: f64,
) -> Result<Order, QuantError> {
    if quantity <= 0.0 {
        return Err(QuantError::Validation {
            reason: format!("order quantity must be positive, got {quantity}"),
        });
    }
    if fill_price <= 0.0 {
        return Err(QuantError::Validation {
            reason: format!("fill price must be positive, got {fill_price}"),
        });
    }

    let (base_asset, quote_asset) = split_symbol(symbol)?;

    let locked_amount = match side {
        OrderSide::Buy => fill_price * quantity * FEE_BUFFER,
        OrderSide::Sell => quantity,
    };
    let lock_asset = match side {
        OrderSide::Buy => quote_asset.as_str(),
        OrderSide::Sell => base_asset.as_str(),
    };

    wallet.lock(lock_asset, locked_amount)?;

    let fee = fill_price * quantity * FEE_RATE;
    let quote_amount = fill_price * quantity;

    match side {
        OrderSide::Buy => {
            // The fee is debited from free quote balance; nothing has
            // settled yet, so a shortfall only needs the lock released.
            if !wallet.has_sufficient_balance(&quote_asset, fee) {
                wallet.unlock(lock_asset, locked_amount)?;
                let have = wallet.balance(&quote_asset).map(|b| b.free).unwrap_or(0.0);
                return Err(QuantError::InsufficientFree {
                    asset: quote_asset,
                    have,
                    need: fee,
                });
            }
            wallet.transfer(&quote_asset, locked_amount, &base_asset, quantity)?;
            wallet.credit(&quote_asset, -fee)?;
        }
        OrderSide::Sell => {
            wallet.transfer(&base_asset, quantity, &quote_asset, quote_amount - fee)?;
        }
    }

    let signed_qty = match side {
        OrderSide::Buy => quantity,
        OrderSide::Sell => -quantity,
    };
    portfolio.update_position(symbol, signed_qty, fill_price);

    let now = Utc::now();
    Ok(Order {
        id: format!("ORDER_{}", now.timestamp_nanos_opt().unwrap_or_default()),
        symbol: symbol.to_string(),
        side,
        order_type: OrderType::Market,
        quantity,
        price: fill_price,
        status: OrderStatus::Filled,
        filled_qty: quantity,
        avg_price: fill_price,
        created_at: now,
        updated_at: now,
        executed_at: Some(now),
    })
}
