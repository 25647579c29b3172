use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::collateral::{Cooperative, StagedProjectParams};
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::loan::interest::SimpleInterest;
use crate::types::{AccountId, BatchId, LoanId, LoanKind, LoanStatus};

/// request to finance against existing inventory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub counterparty: AccountId,
    pub amount: Money,
    pub rate: Rate,
    pub duration_secs: i64,
    pub batches: Vec<BatchId>,
    pub purpose: String,
    pub name: String,
    pub location: String,
}

/// request to finance a greenfield project in stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedLoanRequest {
    pub counterparty: AccountId,
    pub amount: Money,
    pub rate: Rate,
    pub duration_secs: i64,
    pub project: StagedProjectParams,
    pub cooperative: Cooperative,
    pub purpose: String,
}

/// one tranche paid out to the counterparty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disbursement {
    pub amount: Money,
    pub at: DateTime<Utc>,
}

/// loan / grant record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub kind: LoanKind,
    pub counterparty: AccountId,
    pub amount: Money,
    pub disbursed: Money,
    pub repaid: Money,
    pub rate: Rate,
    pub duration_secs: i64,
    pub created_at: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub maturity_time: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub batches: Vec<BatchId>,
    pub disbursements: Vec<Disbursement>,
    pub status: LoanStatus,
    pub purpose: String,
    pub name: String,
    pub location: String,
}

impl Loan {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: LoanId,
        kind: LoanKind,
        counterparty: AccountId,
        amount: Money,
        rate: Rate,
        duration_secs: i64,
        batches: Vec<BatchId>,
        purpose: String,
        name: String,
        location: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind,
            counterparty,
            amount,
            disbursed: Money::ZERO,
            repaid: Money::ZERO,
            rate,
            duration_secs,
            created_at: now,
            start_time: now,
            maturity_time: now + Duration::seconds(duration_secs),
            closed_at: None,
            batches,
            disbursements: Vec::new(),
            status: LoanStatus::Pending,
            purpose,
            name,
            location,
        }
    }

    /// principal interest accrues on: the approved amount
    pub fn principal(&self) -> Money {
        self.amount
    }

    /// undisbursed part of the approval
    pub fn available(&self) -> Money {
        self.amount.saturating_sub(self.disbursed)
    }

    /// principal × rate × (now − start); zero while pending, frozen once closed
    pub fn interest_at(&self, model: &SimpleInterest, now: DateTime<Utc>) -> Money {
        if self.status == LoanStatus::Pending {
            return Money::ZERO;
        }
        let end = self.closed_at.unwrap_or(now).min(now);
        model
            .calculate(self.principal(), self.rate, self.start_time, end)
            .interest_amount
    }

    pub fn total_owed(&self, model: &SimpleInterest, now: DateTime<Utc>) -> Money {
        self.principal() + self.interest_at(model, now)
    }

    /// principal + interest − repaid, floored at zero
    pub fn outstanding(&self, model: &SimpleInterest, now: DateTime<Utc>) -> Money {
        self.total_owed(model, now).saturating_sub(self.repaid)
    }

    pub fn is_matured(&self, now: DateTime<Utc>) -> bool {
        now > self.maturity_time
    }

    pub(crate) fn require_status(&self, expected: &[LoanStatus]) -> Result<()> {
        if expected.contains(&self.status) {
            return Ok(());
        }
        Err(LedgerError::WrongState {
            id: self.id,
            current: self.status,
            expected: expected
                .iter()
                .map(|s| format!("{:?}", s))
                .collect::<Vec<_>>()
                .join(" | "),
        })
    }

    pub(crate) fn transition(&mut self, next: LoanStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(LedgerError::WrongState {
                id: self.id,
                current: self.status,
                expected: format!("a status that can move to {:?}", next),
            });
        }
        self.status = next;
        Ok(())
    }

    /// record a payout; the first one starts the term
    pub(crate) fn record_disbursement(&mut self, amount: Money, now: DateTime<Utc>) -> Result<()> {
        if self.status == LoanStatus::Pending {
            self.transition(LoanStatus::Active)?;
            self.start_time = now;
            self.maturity_time = now + Duration::seconds(self.duration_secs);
        }
        self.disbursed += amount;
        self.disbursements.push(Disbursement { amount, at: now });
        Ok(())
    }
}
