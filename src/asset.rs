use std::collections::HashMap;
use tracing::debug;

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::AccountId;

/// external fungible-asset ledger the core moves value through
pub trait AssetLedger {
    fn balance_of(&self, account: &AccountId) -> Money;

    /// must reject on insufficient balance
    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Money) -> Result<()>;
}

/// in-process asset ledger, used by tests, demos and single-node deployments
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetLedger {
    balances: HashMap<AccountId, Money>,
}

impl InMemoryAssetLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// mint into an account (funding the treasury, seeding borrowers)
    pub fn credit(&mut self, account: &AccountId, amount: Money) {
        *self.balances.entry(account.clone()).or_default() += amount;
    }

    pub fn total_supply(&self) -> Money {
        self.balances.values().copied().sum()
    }
}

impl AssetLedger for InMemoryAssetLedger {
    fn balance_of(&self, account: &AccountId) -> Money {
        self.balances.get(account).copied().unwrap_or(Money::ZERO)
    }

    fn transfer(&mut self, from: &AccountId, to: &AccountId, amount: Money) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::TransferFailed {
                message: format!("non-positive amount {}", amount),
            });
        }

        let available = self.balance_of(from);
        if available < amount {
            return Err(LedgerError::TransferFailed {
                message: format!("{} holds {}, needs {}", from, available, amount),
            });
        }

        self.balances.insert(from.clone(), available - amount);
        *self.balances.entry(to.clone()).or_default() += amount;
        debug!(from = %from, to = %to, amount = %amount, "asset transfer");
        Ok(())
    }
}
