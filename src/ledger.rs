use chrono::Duration;
use hourglass_rs::SafeTimeProvider;
use tracing::{info, warn};

use crate::access::{AccessControl, AuthContext, Role};
use crate::asset::AssetLedger;
use crate::collateral::{Batch, BatchRegistration, CollateralRegistry, StagedProject};
use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventRecord, EventStore};
use crate::guard::{CircuitBreaker, ReentrancyGuard};
use crate::loan::{Loan, LoanEngine, LoanRequest, LoanStats, RepaymentReceipt, StagedLoanRequest};
use crate::types::{AccountId, BatchId, LoanId};
use crate::views::{BatchView, LoanView};

/// the financing ledger: collateral registry and loan engine behind role
/// checks, the circuit breaker and the reentrancy guard
pub struct Ledger<A: AssetLedger> {
    config: LedgerConfig,
    access: AccessControl,
    breaker: CircuitBreaker,
    guard: ReentrancyGuard,
    registry: CollateralRegistry,
    engine: LoanEngine,
    assets: A,
    treasury: AccountId,
    events: EventStore,
}

impl<A: AssetLedger> Ledger<A> {
    /// `admin` becomes the first administrator, `treasury` funds
    /// disbursements and holds the treasury role
    pub fn new(config: LedgerConfig, admin: AccountId, treasury: AccountId, assets: A) -> Result<Self> {
        config.validate()?;

        let mut access = AccessControl::new(admin);
        access.assign(&treasury, Role::Treasury);

        Ok(Self {
            engine: LoanEngine::new(&config),
            config,
            access,
            breaker: CircuitBreaker::new(),
            guard: ReentrancyGuard::new(),
            registry: CollateralRegistry::new(),
            assets,
            treasury,
            events: EventStore::new(),
        })
    }

    /// run a value-moving operation holding the reentrancy flag
    pub(crate) fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.guard.enter()?;
        let result = op(self);
        self.guard.exit();
        result
    }

    // access & safety

    pub fn grant_role(&mut self, ctx: &AuthContext, account: &AccountId, role: Role) -> Result<bool> {
        self.breaker.ensure_running()?;
        let granted = self.access.grant(ctx, account, role)?;
        if granted {
            self.events.emit(Event::RoleGranted {
                account: account.clone(),
                role,
                granted_by: ctx.caller.clone(),
            });
            info!(account = %account, role = ?role, "role granted");
        }
        Ok(granted)
    }

    pub fn revoke_role(&mut self, ctx: &AuthContext, account: &AccountId, role: Role) -> Result<bool> {
        self.breaker.ensure_running()?;
        let revoked = self.access.revoke(ctx, account, role)?;
        if revoked {
            self.events.emit(Event::RoleRevoked {
                account: account.clone(),
                role,
                revoked_by: ctx.caller.clone(),
            });
            info!(account = %account, role = ?role, "role revoked");
        }
        Ok(revoked)
    }

    pub fn pause(&mut self, ctx: &AuthContext, time_provider: &SafeTimeProvider) -> Result<()> {
        self.access.require(ctx, Role::Administrator)?;
        self.breaker.pause()?;
        self.events.emit(Event::Paused {
            by: ctx.caller.clone(),
            timestamp: time_provider.now(),
        });
        warn!(by = %ctx.caller, "ledger paused");
        Ok(())
    }

    pub fn unpause(&mut self, ctx: &AuthContext, time_provider: &SafeTimeProvider) -> Result<()> {
        self.access.require(ctx, Role::Administrator)?;
        self.breaker.unpause()?;
        self.events.emit(Event::Unpaused {
            by: ctx.caller.clone(),
            timestamp: time_provider.now(),
        });
        info!(by = %ctx.caller, "ledger resumed");
        Ok(())
    }

    /// move treasury funds to a recovery account; only while paused
    pub fn emergency_withdraw(
        &mut self,
        ctx: &AuthContext,
        to: &AccountId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        self.access.require(ctx, Role::Administrator)?;
        self.breaker.ensure_paused()?;
        self.guarded(|ledger| {
            let available = ledger.assets.balance_of(&ledger.treasury);
            if !amount.is_positive() || amount > available {
                return Err(LedgerError::InsufficientTreasuryBalance {
                    available,
                    required: amount,
                });
            }
            ledger.assets.transfer(&ledger.treasury, to, amount)?;
            ledger.events.emit(Event::EmergencyWithdrawal {
                to: to.clone(),
                amount,
                by: ctx.caller.clone(),
                timestamp: time_provider.now(),
            });
            warn!(to = %to, amount = %amount, "emergency withdrawal");
            Ok(())
        })
    }

    // collateral registry

    pub fn register_batch(
        &mut self,
        ctx: &AuthContext,
        registration: BatchRegistration,
        time_provider: &SafeTimeProvider,
    ) -> Result<BatchId> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Manager)?;
        self.registry.register_batch(registration, time_provider, &mut self.events)
    }

    pub fn verify_batch(
        &mut self,
        ctx: &AuthContext,
        id: BatchId,
        verified_quantity: u64,
        metadata_ref: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Verifier)?;
        self.registry.verify_batch(
            id,
            verified_quantity,
            metadata_ref,
            &ctx.caller,
            time_provider,
            &mut self.events,
        )
    }

    pub fn issue_shares(
        &mut self,
        ctx: &AuthContext,
        id: BatchId,
        amount: u64,
        time_provider: &SafeTimeProvider,
    ) -> Result<u64> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Manager)?;
        self.registry.issue_shares(id, amount, time_provider, &mut self.events)
    }

    pub fn retire_shares(
        &mut self,
        ctx: &AuthContext,
        id: BatchId,
        amount: u64,
        time_provider: &SafeTimeProvider,
    ) -> Result<u64> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Manager)?;
        self.registry.retire_shares(id, amount, time_provider, &mut self.events)
    }

    pub fn adjust_inventory(
        &mut self,
        ctx: &AuthContext,
        id: BatchId,
        new_quantity: u64,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Manager)?;
        self.registry.adjust_inventory(id, new_quantity, time_provider, &mut self.events)
    }

    pub fn mark_expired(
        &mut self,
        ctx: &AuthContext,
        id: BatchId,
        time_provider: &SafeTimeProvider,
    ) -> Result<()> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Manager)?;
        self.registry.mark_expired(id, time_provider, &mut self.events)
    }

    // loan engine

    pub fn create_loan(
        &mut self,
        ctx: &AuthContext,
        request: LoanRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanId> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Manager)?;
        let counterparty = request.counterparty.clone();
        let id = self
            .engine
            .create_loan(request, &self.registry, time_provider, &mut self.events)?;
        self.access.assign(&counterparty, Role::Borrower);
        Ok(id)
    }

    pub fn create_staged_loan(
        &mut self,
        ctx: &AuthContext,
        request: StagedLoanRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanId> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Manager)?;
        let counterparty = request.counterparty.clone();
        let id = self
            .engine
            .create_staged_loan(request, &mut self.registry, time_provider, &mut self.events)?;
        self.access.assign(&counterparty, Role::Borrower);
        Ok(id)
    }

    pub fn disburse(
        &mut self,
        ctx: &AuthContext,
        id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Money> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Manager)?;
        self.guarded(|ledger| {
            ledger.engine.disburse(
                id,
                &mut ledger.assets,
                &ledger.treasury,
                time_provider,
                &mut ledger.events,
            )
        })
    }

    pub fn disburse_stage(
        &mut self,
        ctx: &AuthContext,
        id: LoanId,
        increment: Money,
        evidence_ref: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<u32> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Manager)?;
        self.guarded(|ledger| {
            ledger.engine.disburse_stage(
                id,
                increment,
                evidence_ref,
                &mut ledger.registry,
                &mut ledger.assets,
                &ledger.treasury,
                time_provider,
                &mut ledger.events,
            )
        })
    }

    pub fn repay(
        &mut self,
        ctx: &AuthContext,
        id: LoanId,
        amount: Money,
        time_provider: &SafeTimeProvider,
    ) -> Result<RepaymentReceipt> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Borrower)?;
        self.guarded(|ledger| {
            ledger.engine.repay(
                &ctx.caller,
                id,
                amount,
                &mut ledger.assets,
                &ledger.treasury,
                time_provider,
                &mut ledger.events,
            )
        })
    }

    pub fn mark_defaulted(
        &mut self,
        ctx: &AuthContext,
        id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<bool> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Manager)?;
        self.engine.mark_defaulted(id, time_provider, &mut self.events)
    }

    pub fn liquidate(
        &mut self,
        ctx: &AuthContext,
        id: LoanId,
        time_provider: &SafeTimeProvider,
    ) -> Result<Vec<BatchId>> {
        self.breaker.ensure_running()?;
        self.access.require(ctx, Role::Treasury)?;
        self.engine.liquidate(id, time_provider, &mut self.events)
    }

    // reads, unaffected by the circuit breaker

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn access(&self) -> &AccessControl {
        &self.access
    }

    pub fn registry(&self) -> &CollateralRegistry {
        &self.registry
    }

    pub fn engine(&self) -> &LoanEngine {
        &self.engine
    }

    pub fn assets(&self) -> &A {
        &self.assets
    }

    pub fn treasury(&self) -> &AccountId {
        &self.treasury
    }

    pub fn treasury_balance(&self) -> Money {
        self.assets.balance_of(&self.treasury)
    }

    pub fn is_paused(&self) -> bool {
        self.breaker.is_paused()
    }

    pub fn loan(&self, id: LoanId) -> Result<&Loan> {
        self.engine.loan(id)
    }

    pub fn batch(&self, id: BatchId) -> Result<&Batch> {
        self.registry.batch(id)
    }

    pub fn project(&self, id: BatchId) -> Option<&StagedProject> {
        self.registry.project(id)
    }

    pub fn loans_for(&self, counterparty: &AccountId) -> Vec<&Loan> {
        self.engine.loans_for(counterparty)
    }

    pub fn loan_ids(&self) -> Vec<LoanId> {
        self.engine.loan_ids()
    }

    pub fn active_batches(&self) -> &[BatchId] {
        self.registry.active_batches()
    }

    pub fn interest_owed(&self, id: LoanId, time_provider: &SafeTimeProvider) -> Result<Money> {
        self.engine.interest_owed(id, time_provider.now())
    }

    pub fn outstanding_balance(&self, id: LoanId, time_provider: &SafeTimeProvider) -> Result<Money> {
        self.engine.outstanding_balance(id, time_provider.now())
    }

    pub fn time_to_maturity(&self, id: LoanId, time_provider: &SafeTimeProvider) -> Result<Duration> {
        self.engine.time_to_maturity(id, time_provider.now())
    }

    pub fn stats(&self) -> LoanStats {
        self.engine.stats()
    }

    pub fn loan_view(&self, id: LoanId, time_provider: &SafeTimeProvider) -> Result<LoanView> {
        let loan = self.engine.loan(id)?;
        Ok(LoanView::from_loan(loan, self.engine.interest_model(), time_provider.now()))
    }

    pub fn batch_view(&self, id: BatchId) -> Result<BatchView> {
        let batch = self.registry.batch(id)?;
        Ok(BatchView::from_batch(batch, self.registry.project(id)))
    }

    pub fn events(&self) -> &[EventRecord] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<EventRecord> {
        self.events.take_events()
    }
}
