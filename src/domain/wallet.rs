//! Multi-asset balance book with free/locked accounting.
//!
//! Mutations take the exclusive lock, reads take the shared lock. Within a
//! backtest run no contention occurs, but the contract must hold because
//! the same type serves the live code paths.

use crate::domain::error::QuantError;
use std::collections::HashMap;
use std::sync::RwLock;

/// Per-asset balance. Invariant: `total = free + locked`, both non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
    pub total: f64,
}

impl Balance {
    fn new(asset: &str, free: f64) -> Self {
        Balance {
            asset: asset.to_string(),
            free,
            locked: 0.0,
            total: free,
        }
    }
}

/// Asset ledger. Knows nothing about prices or symbols.
#[derive(Debug, Default)]
pub struct Wallet {
    balances: RwLock<HashMap<String, Balance>>,
}

impl Wallet {
    pub fn new(initial_balances: HashMap<String, f64>) -> Self {
        let balances = initial_balances
            .into_iter()
            .map(|(asset, amount)| (asset.clone(), Balance::new(&asset, amount)))
            .collect();

        Wallet {
            balances: RwLock::new(balances),
        }
    }

    pub fn balance(&self, asset: &str) -> Result<Balance, QuantError> {
        let balances = self.balances.read().expect("wallet lock poisoned");
        balances
            .get(asset)
            .cloned()
            .ok_or_else(|| QuantError::Validation {
                reason: format!("balance not found for asset: {asset}"),
            })
    }

    pub fn all_balances(&self) -> Vec<Balance> {
        let balances = self.balances.read().expect("wallet lock poisoned");
        let mut all: Vec<Balance> = balances.values().cloned().collect();
        all.sort_by(|a, b| a.asset.cmp(&b.asset));
        all
    }

    /// Move `amount` from free to locked.
    pub fn lock(&self, asset: &str, amount: f64) -> Result<(), QuantError> {
        let mut balances = self.balances.write().expect("wallet lock poisoned");
        let balance = balances
            .get_mut(asset)
            .ok_or_else(|| QuantError::Validation {
                reason: format!("balance not found for asset: {asset}"),
            })?;

        if balance.free < amount {
            return Err(QuantError::InsufficientFree {
                asset: asset.to_string(),
                have: balance.free,
                need: amount,
            });
        }

        balance.free -= amount;
        balance.locked += amount;
        Ok(())
    }

    /// Move `amount` from locked back to free.
    pub fn unlock(&self, asset: &str, amount: f64) -> Result<(), QuantError> {
        let mut balances = self.balances.write().expect("wallet lock poisoned");
        let balance = balances
            .get_mut(asset)
            .ok_or_else(|| QuantError::Validation {
                reason: format!("balance not found for asset: {asset}"),
            })?;

        if balance.locked < amount {
            return Err(QuantError::InsufficientLocked {
                asset: asset.to_string(),
                have: balance.locked,
                need: amount,
            });
        }

        balance.locked -= amount;
        balance.free += amount;
        Ok(())
    }

    /// Consume `amount` from locked (a paid-out fill) and recompute total.
    pub fn deduct(&self, asset: &str, amount: f64) -> Result<(), QuantError> {
        let mut balances = self.balances.write().expect("wallet lock poisoned");
        let balance = balances
            .get_mut(asset)
            .ok_or_else(|| QuantError::Validation {
                reason: format!("balance not found for asset: {asset}"),
            })?;

        if balance.locked < amount {
            return Err(QuantError::InsufficientLocked {
                asset: asset.to_string(),
                have: balance.locked,
                need: amount,
            });
        }

        balance.locked -= amount;
        balance.total = balance.free + balance.locked;
        Ok(())
    }

    /// Add `amount` to free, creating the balance record if absent.
    ///
    /// `amount` may be negative (a fee debit); a debit that would push free
    /// below zero is refused so the `free >= 0` invariant holds at the API
    /// boundary.
    pub fn credit(&self, asset: &str, amount: f64) -> Result<(), QuantError> {
        let mut balances = self.balances.write().expect("wallet lock poisoned");

        match balances.get_mut(asset) {
            Some(balance) => {
                if balance.free + amount < 0.0 {
                    return Err(QuantError::InsufficientFree {
                        asset: asset.to_string(),
                        have: balance.free,
                        need: -amount,
                    });
                }
                balance.free += amount;
                balance.total = balance.free + balance.locked;
            }
            None => {
                if amount < 0.0 {
                    return Err(QuantError::InsufficientFree {
                        asset: asset.to_string(),
                        have: 0.0,
                        need: -amount,
                    });
                }
                balances.insert(asset.to_string(), Balance::new(asset, amount));
            }
        }

        Ok(())
    }

    /// Consume `from_amount` from the source asset's locked balance and add
    /// `to_amount` to the destination's free balance. Atomic under the
    /// wallet's write lock.
    pub fn transfer(
        &self,
        from_asset: &str,
        from_amount: f64,
        to_asset: &str,
        to_amount: f64,
    ) -> Result<(), QuantError> {
        let mut balances = self.balances.write().expect("wallet lock poisoned");

        let from = balances
            .get_mut(from_asset)
            .ok_or_else(|| QuantError::Validation {
                reason: format!("source balance not found for asset: {from_asset}"),
            })?;

        if from.locked < from_amount {
            return Err(QuantError::InsufficientLocked {
                asset: from_asset.to_string(),
                have: from.locked,
                need: from_amount,
            });
        }

        from.locked -= from_amount;
        from.total = from.free + from.locked;

        match balances.get_mut(to_asset) {
            Some(to) => {
                to.free += to_amount;
                to.total = to.free + to.locked;
            }
            None => {
                balances.insert(to_asset.to_string(), Balance::new(to_asset, to_amount));
            }
        }

        Ok(())
    }

    pub fn has_sufficient_balance(&self, asset: &str, amount: f64) -> bool {
        let balances = self.balances.read().expect("wallet lock poisoned");
        balances
            .get(asset)
            .map(|b| b.free >= amount)
            .unwrap_or(false)
    }
}
