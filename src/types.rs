use serde::{Deserialize, Serialize};
use std::fmt;

/// account on the external asset ledger (cooperative wallet, treasury, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// sequential batch identifier, starts at 1 and is never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(pub u64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch#{}", self.0)
    }
}

/// sequential loan identifier, starts at 1 and is never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LoanId(pub u64);

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loan#{}", self.0)
    }
}

/// loan status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// created, nothing disbursed yet
    Pending,
    /// funds disbursed, interest running
    Active,
    /// principal and interest fully repaid
    Repaid,
    /// matured with an outstanding balance
    Defaulted,
    /// collateral handed to the treasury after default
    Liquidated,
}

impl LoanStatus {
    /// directed transition graph; nothing re-enters an earlier state
    pub fn can_transition_to(self, next: LoanStatus) -> bool {
        use LoanStatus::*;
        matches!(
            (self, next),
            (Pending, Active) | (Active, Repaid) | (Active, Defaulted) | (Defaulted, Liquidated)
        )
    }

    pub fn is_closed(self) -> bool {
        matches!(self, LoanStatus::Repaid | LoanStatus::Liquidated)
    }
}

/// loan variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanKind {
    /// backed by existing inventory batches, disbursed in one shot
    Standard,
    /// greenfield project, disbursed per milestone against future yield
    Staged,
}

/// what a collateral unit represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollateralKind {
    /// physical inventory on hand
    Inventory,
    /// placeholder for a future harvest
    Staged,
}
