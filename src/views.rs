/// serialization support for loans and batches
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::collateral::{Batch, StagedProject};
use crate::decimal::{Money, Rate};
use crate::loan::{Loan, SimpleInterest};
use crate::types::{AccountId, BatchId, CollateralKind, LoanId, LoanKind, LoanStatus};

/// serializable view of a loan at a point in time
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: LoanId,
    pub kind: LoanKind,
    pub counterparty: AccountId,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub maturity_time: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub financial: LoanFinancialView,
    pub batches: Vec<BatchId>,
    pub metadata: LoanMetadataView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanFinancialView {
    pub approved_amount: Money,
    pub total_disbursed: Money,
    pub available: Money,
    pub accrued_interest: Money,
    pub total_owed: Money,
    pub total_repaid: Money,
    pub outstanding: Money,
    pub interest_rate: Rate,
    pub disbursement_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanMetadataView {
    pub purpose: String,
    pub name: String,
    pub location: String,
    pub duration_secs: i64,
}

impl LoanView {
    pub fn from_loan(loan: &Loan, model: &SimpleInterest, now: DateTime<Utc>) -> Self {
        LoanView {
            id: loan.id,
            kind: loan.kind,
            counterparty: loan.counterparty.clone(),
            status: loan.status,
            created_at: loan.created_at,
            start_time: loan.start_time,
            maturity_time: loan.maturity_time,
            closed_at: loan.closed_at,
            financial: LoanFinancialView {
                approved_amount: loan.amount,
                total_disbursed: loan.disbursed,
                available: loan.available(),
                accrued_interest: loan.interest_at(model, now),
                total_owed: loan.total_owed(model, now),
                total_repaid: loan.repaid,
                outstanding: loan.outstanding(model, now),
                interest_rate: loan.rate,
                disbursement_count: loan.disbursements.len(),
            },
            batches: loan.batches.clone(),
            metadata: LoanMetadataView {
                purpose: loan.purpose.clone(),
                name: loan.name.clone(),
                location: loan.location.clone(),
                duration_secs: loan.duration_secs,
            },
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// serializable view of a collateral unit
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchView {
    pub id: BatchId,
    pub kind: CollateralKind,
    pub cooperative: String,
    pub payment_address: AccountId,
    pub current_quantity: u64,
    pub outstanding_shares: u64,
    pub unissued_quantity: u64,
    pub inventory_value: Money,
    pub verified: bool,
    pub metadata_ref: Option<String>,
    pub expiry_date: DateTime<Utc>,
    pub expired: bool,
    pub active: bool,
    pub project: Option<ProjectView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectView {
    pub name: String,
    pub expected_yield: u64,
    pub harvest_date: DateTime<Utc>,
    pub completed_stages: u32,
    pub total_stages: u32,
}

impl BatchView {
    pub fn from_batch(batch: &Batch, project: Option<&StagedProject>) -> Self {
        BatchView {
            id: batch.id,
            kind: batch.kind,
            cooperative: batch.cooperative.name.clone(),
            payment_address: batch.cooperative.payment_address.clone(),
            current_quantity: batch.current_quantity,
            outstanding_shares: batch.outstanding_shares,
            unissued_quantity: batch.unissued_quantity(),
            inventory_value: batch.inventory_value(),
            verified: batch.verified,
            metadata_ref: batch.metadata_ref.clone(),
            expiry_date: batch.expiry_date,
            expired: batch.expired,
            active: batch.is_active(),
            project: project.map(|p| ProjectView {
                name: p.name.clone(),
                expected_yield: p.expected_yield,
                harvest_date: p.harvest_date,
                completed_stages: p.completed_stages,
                total_stages: p.total_stages,
            }),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
