pub mod access;
pub mod asset;
pub mod collateral;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod guard;
pub mod ledger;
pub mod loan;
pub mod types;
pub mod views;

// re-export key types
pub use access::{AccessControl, AuthContext, Role};
pub use asset::{AssetLedger, InMemoryAssetLedger};
pub use collateral::{
    Batch, BatchRegistration, CollateralBook, CollateralRegistry, Cooperative, StagedProject,
    StagedProjectParams,
};
pub use config::{InterestConfig, LedgerConfig, LoanLimits, SECONDS_PER_YEAR};
pub use decimal::{Money, Rate};
pub use errors::{LedgerError, Result};
pub use events::{Event, EventRecord, EventStore};
pub use guard::{CircuitBreaker, ReentrancyGuard};
pub use ledger::Ledger;
pub use loan::{
    InterestCalculation, Loan, LoanEngine, LoanRequest, LoanStats, RepaymentReceipt,
    SimpleInterest, StagedLoanRequest,
};
pub use types::{AccountId, BatchId, CollateralKind, LoanId, LoanKind, LoanStatus};
pub use views::{BatchView, LoanView};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
