pub mod engine;
pub mod interest;
pub mod record;

pub use engine::{LoanEngine, LoanStats, RepaymentReceipt};
pub use interest::{InterestCalculation, SimpleInterest};
pub use record::{Disbursement, Loan, LoanRequest, StagedLoanRequest};
