use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::errors::{LedgerError, Result};
use crate::types::AccountId;

/// capability held by an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// grants roles, pauses the ledger, emergency withdrawal
    Administrator,
    /// registers and maintains batches, creates and disburses loans
    Manager,
    /// attests batch quantity and metadata
    Verifier,
    /// liquidates defaulted loans
    Treasury,
    /// may repay loans it is the counterparty of
    Borrower,
}

/// who is making the call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub caller: AccountId,
}

impl AuthContext {
    pub fn new(caller: impl Into<String>) -> Self {
        Self {
            caller: AccountId::new(caller),
        }
    }

    pub fn for_account(caller: &AccountId) -> Self {
        Self {
            caller: caller.clone(),
        }
    }
}

/// role table, checked before any state change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessControl {
    roles: HashMap<AccountId, HashSet<Role>>,
}

impl AccessControl {
    /// new table with a single administrator
    pub fn new(admin: AccountId) -> Self {
        let mut roles = HashMap::new();
        roles.insert(admin, HashSet::from([Role::Administrator]));
        Self { roles }
    }

    pub fn has_role(&self, account: &AccountId, role: Role) -> bool {
        self.roles
            .get(account)
            .map(|set| set.contains(&role))
            .unwrap_or(false)
    }

    pub fn require(&self, ctx: &AuthContext, role: Role) -> Result<()> {
        if self.has_role(&ctx.caller, role) {
            Ok(())
        } else {
            warn!(caller = %ctx.caller, role = ?role, "rejected call lacking role");
            Err(LedgerError::Unauthorized {
                caller: ctx.caller.clone(),
                role,
            })
        }
    }

    /// administrator-only grant; returns false when already held
    pub fn grant(&mut self, ctx: &AuthContext, account: &AccountId, role: Role) -> Result<bool> {
        self.require(ctx, Role::Administrator)?;
        Ok(self.assign(account, role))
    }

    /// administrator-only revoke; the last administrator cannot be removed
    pub fn revoke(&mut self, ctx: &AuthContext, account: &AccountId, role: Role) -> Result<bool> {
        self.require(ctx, Role::Administrator)?;

        if role == Role::Administrator
            && self.has_role(account, Role::Administrator)
            && self.holders(Role::Administrator).len() == 1
        {
            return Err(LedgerError::InvalidConfiguration {
                message: "cannot revoke the last administrator".to_string(),
            });
        }

        Ok(self
            .roles
            .get_mut(account)
            .map(|set| set.remove(&role))
            .unwrap_or(false))
    }

    /// internal grant used by the loan engine for borrowers
    pub(crate) fn assign(&mut self, account: &AccountId, role: Role) -> bool {
        self.roles.entry(account.clone()).or_default().insert(role)
    }

    pub fn holders(&self, role: Role) -> Vec<&AccountId> {
        let mut holders: Vec<&AccountId> = self
            .roles
            .iter()
            .filter(|(_, set)| set.contains(&role))
            .map(|(account, _)| account)
            .collect();
        holders.sort();
        holders
    }
}
