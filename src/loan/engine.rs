use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::asset::AssetLedger;
use crate::collateral::CollateralBook;
use crate::config::{LedgerConfig, LoanLimits};
use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::loan::interest::SimpleInterest;
use crate::loan::record::{Loan, LoanRequest, StagedLoanRequest};
use crate::types::{AccountId, BatchId, LoanId, LoanKind, LoanStatus};

/// outcome of a repayment after the clamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentReceipt {
    pub loan_id: LoanId,
    pub requested: Money,
    pub applied: Money,
    pub total_repaid: Money,
    pub remaining: Money,
    pub status: LoanStatus,
}

/// aggregate figures across all loans
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanStats {
    pub total_loans: usize,
    pub pending: usize,
    pub active: usize,
    pub repaid: usize,
    pub defaulted: usize,
    pub liquidated: usize,
    pub total_approved: Money,
    pub total_disbursed: Money,
    pub total_repaid: Money,
}

/// owns loan records, the batch → loan reverse index and the lifecycle
#[derive(Debug, Clone)]
pub struct LoanEngine {
    loans: Vec<Loan>,
    batch_index: HashMap<BatchId, LoanId>,
    by_counterparty: HashMap<AccountId, Vec<LoanId>>,
    loan_limits: LoanLimits,
    staged_limits: LoanLimits,
    interest: SimpleInterest,
}

impl LoanEngine {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            loans: Vec::new(),
            batch_index: HashMap::new(),
            by_counterparty: HashMap::new(),
            loan_limits: config.loan_limits.clone(),
            staged_limits: config.staged_limits.clone(),
            interest: SimpleInterest::from_config(&config.interest),
        }
    }

    fn next_id(&self) -> LoanId {
        LoanId(self.loans.len() as u64 + 1)
    }

    fn index(&self, id: LoanId) -> Result<usize> {
        (id.0 as usize)
            .checked_sub(1)
            .filter(|i| *i < self.loans.len())
            .ok_or(LedgerError::RecordNotFound { id })
    }

    pub fn loan(&self, id: LoanId) -> Result<&Loan> {
        let i = self.index(id)?;
        Ok(&self.loans[i])
    }

    pub fn interest_model(&self) -> &SimpleInterest {
        &self.interest
    }

    fn validate_terms(limits: &LoanLimits, amount: Money, rate: Rate, duration_secs: i64) -> Result<()> {
        if amount < limits.minimum_amount {
            return Err(LedgerError::InvalidAmount {
                minimum: limits.minimum_amount,
                requested: amount,
            });
        }
        if duration_secs <= 0 || duration_secs > limits.max_duration_secs {
            return Err(LedgerError::InvalidDuration {
                seconds: duration_secs,
                maximum: limits.max_duration_secs,
            });
        }
        if rate > limits.max_rate {
            return Err(LedgerError::InvalidRate {
                rate,
                ceiling: limits.max_rate,
            });
        }
        Ok(())
    }

    fn store(&mut self, loan: Loan) -> LoanId {
        let id = loan.id;
        for batch in &loan.batches {
            self.batch_index.insert(*batch, id);
        }
        self.by_counterparty
            .entry(loan.counterparty.clone())
            .or_default()
            .push(id);
        self.loans.push(loan);
        id
    }

    fn emit_created(loan: &Loan, events: &mut EventStore) {
        events.emit(Event::LoanCreated {
            loan_id: loan.id,
            kind: loan.kind,
            counterparty: loan.counterparty.clone(),
            amount: loan.amount,
            rate_bps: loan.rate.bps(),
            maturity_time: loan.maturity_time,
            batches: loan.batches.clone(),
        });
    }

    /// create a pending loan reserving every referenced inventory batch
    pub fn create_loan<C: CollateralBook + ?Sized>(
        &mut self,
        request: LoanRequest,
        collateral: &C,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<LoanId> {
        Self::validate_terms(&self.loan_limits, request.amount, request.rate, request.duration_secs)?;

        if request.batches.is_empty() {
            return Err(LedgerError::InvalidCollateral {
                batch: BatchId(0),
                message: "at least one batch required".to_string(),
            });
        }

        // all checks before any reservation so a bad id leaves nothing locked
        let mut seen = HashSet::new();
        for batch in &request.batches {
            if !seen.insert(*batch) {
                return Err(LedgerError::InvalidCollateral {
                    batch: *batch,
                    message: "listed twice".to_string(),
                });
            }
            if !collateral.batch_exists(*batch) {
                return Err(LedgerError::InvalidCollateral {
                    batch: *batch,
                    message: "does not exist".to_string(),
                });
            }
            if !collateral.is_inventory(*batch) {
                return Err(LedgerError::InvalidCollateral {
                    batch: *batch,
                    message: "not an inventory batch".to_string(),
                });
            }
            if !collateral.is_active(*batch) {
                return Err(LedgerError::InvalidCollateral {
                    batch: *batch,
                    message: "expired or out of stock".to_string(),
                });
            }
            if let Some(owner) = self.batch_index.get(batch) {
                return Err(LedgerError::InvalidCollateral {
                    batch: *batch,
                    message: format!("already linked to {}", owner),
                });
            }
        }

        let loan = Loan::new(
            self.next_id(),
            LoanKind::Standard,
            request.counterparty,
            request.amount,
            request.rate,
            request.duration_secs,
            request.batches,
            request.purpose,
            request.name,
            request.location,
            time_provider.now(),
        );

        Self::emit_created(&loan, events);
        info!(
            loan = %loan.id,
            counterparty = %loan.counterparty,
            amount = %loan.amount,
            batches = ?loan.batches,
            "loan created"
        );
        Ok(self.store(loan))
    }

    /// create a pending greenfield loan linked to a fresh staged placeholder
    pub fn create_staged_loan<C: CollateralBook + ?Sized>(
        &mut self,
        request: StagedLoanRequest,
        collateral: &mut C,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<LoanId> {
        Self::validate_terms(&self.staged_limits, request.amount, request.rate, request.duration_secs)?;

        let now = time_provider.now();
        let name = request.project.name.clone();
        let location = request.cooperative.location.clone();
        let placeholder = collateral.create_staged_project(
            request.project,
            request.cooperative,
            request.amount,
            now,
            events,
        )?;

        let loan = Loan::new(
            self.next_id(),
            LoanKind::Staged,
            request.counterparty,
            request.amount,
            request.rate,
            request.duration_secs,
            vec![placeholder],
            request.purpose,
            name,
            location,
            now,
        );

        Self::emit_created(&loan, events);
        info!(loan = %loan.id, placeholder = %placeholder, amount = %loan.amount, "staged loan created");
        Ok(self.store(loan))
    }

    fn ensure_treasury<A: AssetLedger + ?Sized>(assets: &A, treasury: &AccountId, required: Money) -> Result<()> {
        let available = assets.balance_of(treasury);
        if available < required {
            return Err(LedgerError::InsufficientTreasuryBalance { available, required });
        }
        Ok(())
    }

    /// single-shot payout of the whole approval
    pub fn disburse<A: AssetLedger + ?Sized>(
        &mut self,
        id: LoanId,
        assets: &mut A,
        treasury: &AccountId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Money> {
        let i = self.index(id)?;
        let now = time_provider.now();

        let loan = &self.loans[i];
        if loan.kind != LoanKind::Standard {
            return Err(LedgerError::InvalidCollateral {
                batch: loan.batches[0],
                message: "staged collateral must be disbursed per stage".to_string(),
            });
        }
        loan.require_status(&[LoanStatus::Pending])?;
        Self::ensure_treasury(assets, treasury, loan.amount)?;

        // bookkeeping first, transfer last
        let before = loan.clone();
        let loan = &mut self.loans[i];
        let amount = loan.amount;
        loan.record_disbursement(amount, now)?;
        let counterparty = loan.counterparty.clone();

        if let Err(e) = assets.transfer(treasury, &counterparty, amount) {
            warn!(loan = %id, error = %e, "disbursement transfer failed, reverting");
            self.loans[i] = before;
            return Err(e);
        }

        events.emit(Event::LoanDisbursed {
            loan_id: id,
            counterparty,
            amount,
            total_disbursed: amount,
            timestamp: now,
        });
        info!(loan = %id, amount = %amount, "loan disbursed");
        Ok(amount)
    }

    /// incremental payout against the next milestone of a staged project
    #[allow(clippy::too_many_arguments)]
    pub fn disburse_stage<C, A>(
        &mut self,
        id: LoanId,
        increment: Money,
        evidence_ref: &str,
        collateral: &mut C,
        assets: &mut A,
        treasury: &AccountId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<u32>
    where
        C: CollateralBook + ?Sized,
        A: AssetLedger + ?Sized,
    {
        let i = self.index(id)?;
        let now = time_provider.now();

        let loan = &self.loans[i];
        loan.require_status(&[LoanStatus::Pending, LoanStatus::Active])?;
        let unit = loan.batches[0];
        if !collateral.is_staged(unit) {
            return Err(LedgerError::InvalidCollateral {
                batch: unit,
                message: "not a staged project".to_string(),
            });
        }
        if !increment.is_positive() {
            return Err(LedgerError::InvalidAmount {
                minimum: Money::ZERO,
                requested: increment,
            });
        }
        let requested_total = loan.disbursed + increment;
        if requested_total > loan.amount {
            return Err(LedgerError::ExceedsApprovedAmount {
                approved: loan.amount,
                requested_total,
            });
        }
        Self::ensure_treasury(assets, treasury, increment)?;

        let before = loan.clone();
        let stage = collateral.advance_stage(unit, evidence_ref, now)?;
        let loan = &mut self.loans[i];
        loan.record_disbursement(increment, now)?;
        let counterparty = loan.counterparty.clone();
        let total_disbursed = loan.disbursed;

        if let Err(e) = assets.transfer(treasury, &counterparty, increment) {
            warn!(loan = %id, stage, error = %e, "stage transfer failed, reverting");
            self.loans[i] = before;
            collateral.rewind_stage(unit);
            return Err(e);
        }

        events.emit(Event::LoanDisbursed {
            loan_id: id,
            counterparty,
            amount: increment,
            total_disbursed,
            timestamp: now,
        });
        events.emit(Event::StageCompleted {
            loan_id: id,
            batch_id: unit,
            stage,
            evidence_ref: evidence_ref.to_string(),
            timestamp: now,
        });
        info!(loan = %id, stage, increment = %increment, total = %total_disbursed, "stage disbursed");
        Ok(stage)
    }

    /// counterparty repayment, clamped to what is still owed
    pub fn repay<A: AssetLedger + ?Sized>(
        &mut self,
        caller: &AccountId,
        id: LoanId,
        amount: Money,
        assets: &mut A,
        treasury: &AccountId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<RepaymentReceipt> {
        let i = self.index(id)?;
        let now = time_provider.now();

        let loan = &self.loans[i];
        if &loan.counterparty != caller {
            return Err(LedgerError::UnauthorizedCounterparty {
                id,
                caller: caller.clone(),
            });
        }
        if !amount.is_positive() {
            return Err(LedgerError::InvalidRepaymentAmount { amount });
        }
        loan.require_status(&[LoanStatus::Active])?;

        let total_owed = loan.total_owed(&self.interest, now);
        let applied = amount.min(total_owed.saturating_sub(loan.repaid));

        let before = loan.clone();
        let loan = &mut self.loans[i];
        loan.repaid += applied;
        let closed = loan.repaid >= total_owed;
        if closed {
            loan.transition(LoanStatus::Repaid)?;
            loan.closed_at = Some(now);
        }
        let total_repaid = loan.repaid;
        let remaining = total_owed.saturating_sub(total_repaid);

        if applied.is_positive() {
            if let Err(e) = assets.transfer(caller, treasury, applied) {
                warn!(loan = %id, error = %e, "repayment transfer failed, reverting");
                self.loans[i] = before;
                return Err(e);
            }
        }

        events.emit(Event::RepaymentReceived {
            loan_id: id,
            amount: applied,
            total_repaid,
            remaining,
            timestamp: now,
        });
        info!(loan = %id, requested = %amount, applied = %applied, remaining = %remaining, "repayment received");

        if closed {
            let released = self.release_collateral(i);
            events.emit(Event::LoanRepaid {
                loan_id: id,
                total_repaid,
                released_batches: released,
                timestamp: now,
            });
            info!(loan = %id, "loan repaid in full");
        }

        Ok(RepaymentReceipt {
            loan_id: id,
            requested: amount,
            applied,
            total_repaid,
            remaining,
            status: self.loans[i].status,
        })
    }

    /// repaid collateral goes back to the cooperative and may back a new loan
    fn release_collateral(&mut self, i: usize) -> Vec<BatchId> {
        let loan = &self.loans[i];
        for batch in &loan.batches {
            self.batch_index.remove(batch);
        }
        loan.batches.clone()
    }

    /// flag a matured loan with an outstanding balance; false when nothing is owed
    pub fn mark_defaulted(
        &mut self,
        id: LoanId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<bool> {
        let i = self.index(id)?;
        let now = time_provider.now();

        let loan = &self.loans[i];
        loan.require_status(&[LoanStatus::Active])?;
        if !loan.is_matured(now) {
            return Err(LedgerError::PrematureDefault {
                id,
                maturity: loan.maturity_time,
                now,
            });
        }

        let outstanding = loan.outstanding(&self.interest, now);
        if !outstanding.is_positive() {
            debug!(loan = %id, "matured with nothing outstanding, default skipped");
            return Ok(false);
        }

        self.loans[i].transition(LoanStatus::Defaulted)?;
        events.emit(Event::LoanDefaulted {
            loan_id: id,
            outstanding,
            timestamp: now,
        });
        warn!(loan = %id, outstanding = %outstanding, "loan defaulted");
        Ok(true)
    }

    /// hand a defaulted loan's collateral to the treasury
    pub fn liquidate(
        &mut self,
        id: LoanId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<Vec<BatchId>> {
        let i = self.index(id)?;
        let now = time_provider.now();

        self.loans[i].require_status(&[LoanStatus::Defaulted])?;
        let outstanding = self.loans[i].outstanding(&self.interest, now);

        let loan = &mut self.loans[i];
        loan.transition(LoanStatus::Liquidated)?;
        loan.closed_at = Some(now);
        let batches = loan.batches.clone();

        events.emit(Event::LoanLiquidated {
            loan_id: id,
            batches: batches.clone(),
            outstanding,
            timestamp: now,
        });
        info!(loan = %id, batches = ?batches, outstanding = %outstanding, "loan liquidated");
        Ok(batches)
    }

    pub fn loans_for(&self, counterparty: &AccountId) -> Vec<&Loan> {
        self.by_counterparty
            .get(counterparty)
            .map(|ids| ids.iter().filter_map(|id| self.loan(*id).ok()).collect())
            .unwrap_or_default()
    }

    pub fn loan_ids(&self) -> Vec<LoanId> {
        self.loans.iter().map(|l| l.id).collect()
    }

    pub fn loan_for_batch(&self, batch: BatchId) -> Option<LoanId> {
        self.batch_index.get(&batch).copied()
    }

    pub fn interest_owed(&self, id: LoanId, now: DateTime<Utc>) -> Result<Money> {
        Ok(self.loan(id)?.interest_at(&self.interest, now))
    }

    pub fn outstanding_balance(&self, id: LoanId, now: DateTime<Utc>) -> Result<Money> {
        Ok(self.loan(id)?.outstanding(&self.interest, now))
    }

    /// time left until maturity; negative once matured
    pub fn time_to_maturity(&self, id: LoanId, now: DateTime<Utc>) -> Result<Duration> {
        Ok(self.loan(id)?.maturity_time - now)
    }

    pub fn stats(&self) -> LoanStats {
        let mut stats = LoanStats {
            total_loans: self.loans.len(),
            ..LoanStats::default()
        };
        for loan in &self.loans {
            match loan.status {
                LoanStatus::Pending => stats.pending += 1,
                LoanStatus::Active => stats.active += 1,
                LoanStatus::Repaid => stats.repaid += 1,
                LoanStatus::Defaulted => stats.defaulted += 1,
                LoanStatus::Liquidated => stats.liquidated += 1,
            }
            stats.total_approved += loan.amount;
            stats.total_disbursed += loan.disbursed;
            stats.total_repaid += loan.repaid;
        }
        stats
    }
}
