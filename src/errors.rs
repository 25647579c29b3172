use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::access::Role;
use crate::decimal::{Money, Rate};
use crate::types::{AccountId, BatchId, LoanId, LoanStatus};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("invalid amount: minimum {minimum}, requested {requested}")]
    InvalidAmount {
        minimum: Money,
        requested: Money,
    },

    #[error("invalid duration: {seconds}s (maximum {maximum}s)")]
    InvalidDuration {
        seconds: i64,
        maximum: i64,
    },

    #[error("invalid interest rate: {rate} exceeds ceiling {ceiling}")]
    InvalidRate {
        rate: Rate,
        ceiling: Rate,
    },

    #[error("disbursement exceeds approved amount: approved {approved}, cumulative {requested_total}")]
    ExceedsApprovedAmount {
        approved: Money,
        requested_total: Money,
    },

    #[error("insufficient treasury balance: available {available}, required {required}")]
    InsufficientTreasuryBalance {
        available: Money,
        required: Money,
    },

    #[error("loan not found: {id}")]
    RecordNotFound {
        id: LoanId,
    },

    #[error("loan {id} in wrong state: current {current:?}, expected {expected}")]
    WrongState {
        id: LoanId,
        current: LoanStatus,
        expected: String,
    },

    #[error("invalid repayment amount: {amount}")]
    InvalidRepaymentAmount {
        amount: Money,
    },

    #[error("caller {caller} is not the counterparty of loan {id}")]
    UnauthorizedCounterparty {
        id: LoanId,
        caller: AccountId,
    },

    #[error("invalid collateral {batch}: {message}")]
    InvalidCollateral {
        batch: BatchId,
        message: String,
    },

    #[error("loan {id} not yet mature: maturity {maturity}, now {now}")]
    PrematureDefault {
        id: LoanId,
        maturity: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("batch not found: {id}")]
    BatchNotFound {
        id: BatchId,
    },

    #[error("invalid batch: {message}")]
    InvalidBatch {
        message: String,
    },

    #[error("insufficient quantity on batch {id}: available {available}, requested {requested}")]
    InsufficientQuantity {
        id: BatchId,
        available: u64,
        requested: u64,
    },

    #[error("batch {id} not expired: expiry {expiry}")]
    BatchNotExpired {
        id: BatchId,
        expiry: DateTime<Utc>,
    },

    #[error("batch {id} not verified")]
    BatchNotVerified {
        id: BatchId,
    },

    #[error("caller {caller} lacks role {role:?}")]
    Unauthorized {
        caller: AccountId,
        role: Role,
    },

    #[error("ledger is paused")]
    Paused,

    #[error("ledger is not paused")]
    NotPaused,

    #[error("reentrant call rejected")]
    Reentrancy,

    #[error("asset transfer failed: {message}")]
    TransferFailed {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, LedgerError>;
