use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::collateral::active_set::ActiveSet;
use crate::collateral::batch::{Batch, BatchRegistration, Cooperative};
use crate::collateral::staged::{StagedProject, StagedProjectParams};
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::types::{AccountId, BatchId, CollateralKind};

/// what the loan engine needs from the collateral side, by id only
pub trait CollateralBook {
    fn batch_exists(&self, id: BatchId) -> bool;

    fn collateral_kind(&self, id: BatchId) -> Option<CollateralKind>;

    /// holds stock and is not expired
    fn is_active(&self, id: BatchId) -> bool;

    fn is_inventory(&self, id: BatchId) -> bool {
        self.collateral_kind(id) == Some(CollateralKind::Inventory)
    }

    fn is_staged(&self, id: BatchId) -> bool {
        self.collateral_kind(id) == Some(CollateralKind::Staged)
    }

    /// create a placeholder unit for a future harvest
    fn create_staged_project(
        &mut self,
        params: StagedProjectParams,
        cooperative: Cooperative,
        associated_value: Money,
        now: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<BatchId>;

    /// record the next milestone for a staged unit
    fn advance_stage(&mut self, id: BatchId, evidence_ref: &str, now: DateTime<Utc>) -> Result<u32>;

    /// drop the most recent milestone, used when a stage payout fails
    fn rewind_stage(&mut self, id: BatchId);
}

/// catalog of inventory batches plus the active-set index
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollateralRegistry {
    batches: Vec<Batch>,
    projects: HashMap<BatchId, StagedProject>,
    active: ActiveSet,
}

impl CollateralRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> BatchId {
        BatchId(self.batches.len() as u64 + 1)
    }

    fn index(id: BatchId) -> Option<usize> {
        (id.0 as usize).checked_sub(1)
    }

    pub fn batch(&self, id: BatchId) -> Result<&Batch> {
        Self::index(id)
            .and_then(|i| self.batches.get(i))
            .ok_or(LedgerError::BatchNotFound { id })
    }

    fn batch_mut(&mut self, id: BatchId) -> Result<&mut Batch> {
        Self::index(id)
            .and_then(|i| self.batches.get_mut(i))
            .ok_or(LedgerError::BatchNotFound { id })
    }

    /// batch that holds physical inventory and is not expired
    fn inventory_mut(&mut self, id: BatchId) -> Result<&mut Batch> {
        let batch = self.batch_mut(id)?;
        if batch.kind != CollateralKind::Inventory {
            return Err(LedgerError::InvalidBatch {
                message: format!("{} is a staged placeholder", id),
            });
        }
        if batch.expired {
            return Err(LedgerError::InvalidBatch {
                message: format!("{} is expired", id),
            });
        }
        Ok(batch)
    }

    /// register a new batch; stored unverified and active
    pub fn register_batch(
        &mut self,
        registration: BatchRegistration,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<BatchId> {
        let now = time_provider.now();
        registration.validate(now)?;

        let id = self.next_id();
        let batch = Batch::from_registration(id, registration, now);

        events.emit(Event::BatchRegistered {
            batch_id: id,
            cooperative: batch.cooperative.name.clone(),
            payment_address: batch.cooperative.payment_address.clone(),
            quantity: batch.current_quantity,
            unit_price: batch.unit_price,
            expiry_date: batch.expiry_date,
            timestamp: now,
        });
        info!(batch = %id, quantity = batch.current_quantity, "batch registered");

        self.batches.push(batch);
        self.active.insert(id);
        Ok(id)
    }

    /// overwrite quantity with the attested figure and stamp verification
    pub fn verify_batch(
        &mut self,
        id: BatchId,
        verified_quantity: u64,
        metadata_ref: &str,
        verifier: &AccountId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let now = time_provider.now();
        let batch = self.inventory_mut(id)?;

        // zero would desync the active set, which verification never touches
        if verified_quantity == 0 {
            return Err(LedgerError::InvalidBatch {
                message: "verified quantity must be positive".to_string(),
            });
        }
        if verified_quantity < batch.outstanding_shares {
            return Err(LedgerError::InsufficientQuantity {
                id,
                available: verified_quantity,
                requested: batch.outstanding_shares,
            });
        }
        if metadata_ref.trim().is_empty() {
            return Err(LedgerError::InvalidBatch {
                message: "metadata reference required".to_string(),
            });
        }

        batch.verified = true;
        batch.metadata_verified = true;
        batch.current_quantity = verified_quantity;
        batch.verified_quantity = Some(verified_quantity);
        batch.metadata_ref = Some(metadata_ref.to_string());
        batch.last_verified = Some(now);

        events.emit(Event::BatchVerified {
            batch_id: id,
            verifier: verifier.clone(),
            verified_quantity,
            metadata_ref: metadata_ref.to_string(),
            timestamp: now,
        });
        info!(batch = %id, verified_quantity, "batch verified");
        Ok(())
    }

    /// tokenize part of a verified batch
    pub fn issue_shares(
        &mut self,
        id: BatchId,
        amount: u64,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<u64> {
        let batch = self.inventory_mut(id)?;
        if !batch.verified {
            return Err(LedgerError::BatchNotVerified { id });
        }
        if amount == 0 || amount > batch.unissued_quantity() {
            return Err(LedgerError::InsufficientQuantity {
                id,
                available: batch.unissued_quantity(),
                requested: amount,
            });
        }

        batch.outstanding_shares += amount;
        let outstanding = batch.outstanding_shares;

        events.emit(Event::SharesIssued {
            batch_id: id,
            amount,
            outstanding_shares: outstanding,
            timestamp: time_provider.now(),
        });
        debug!(batch = %id, amount, outstanding, "shares issued");
        Ok(outstanding)
    }

    /// consume inventory; leaves the active set on reaching zero
    pub fn retire_shares(
        &mut self,
        id: BatchId,
        amount: u64,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<u64> {
        let batch = self.inventory_mut(id)?;
        if amount == 0 || amount > batch.current_quantity {
            return Err(LedgerError::InsufficientQuantity {
                id,
                available: batch.current_quantity,
                requested: amount,
            });
        }

        batch.current_quantity -= amount;
        batch.outstanding_shares = batch.outstanding_shares.saturating_sub(amount);
        let remaining = batch.current_quantity;

        if remaining == 0 {
            self.active.remove(id);
            info!(batch = %id, "batch exhausted");
        }

        events.emit(Event::SharesRetired {
            batch_id: id,
            amount,
            remaining_quantity: remaining,
            timestamp: time_provider.now(),
        });
        Ok(remaining)
    }

    /// manager correction of the on-hand quantity
    pub fn adjust_inventory(
        &mut self,
        id: BatchId,
        new_quantity: u64,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let batch = self.inventory_mut(id)?;
        if new_quantity < batch.outstanding_shares {
            return Err(LedgerError::InsufficientQuantity {
                id,
                available: new_quantity,
                requested: batch.outstanding_shares,
            });
        }

        let old_quantity = batch.current_quantity;
        batch.current_quantity = new_quantity;

        match (old_quantity, new_quantity) {
            (0, n) if n > 0 => {
                self.active.insert(id);
            }
            (o, 0) if o > 0 => {
                self.active.remove(id);
            }
            _ => {}
        }

        events.emit(Event::InventoryAdjusted {
            batch_id: id,
            old_quantity,
            new_quantity,
            timestamp: time_provider.now(),
        });
        info!(batch = %id, old_quantity, new_quantity, "inventory adjusted");
        Ok(())
    }

    /// deactivate a batch whose expiry has passed
    pub fn mark_expired(
        &mut self,
        id: BatchId,
        time_provider: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let now = time_provider.now();
        let batch = self.batch_mut(id)?;
        if batch.expired {
            return Err(LedgerError::InvalidBatch {
                message: format!("{} already expired", id),
            });
        }
        if !batch.has_passed_expiry(now) {
            return Err(LedgerError::BatchNotExpired {
                id,
                expiry: batch.expiry_date,
            });
        }

        batch.expired = true;
        self.active.remove(id);

        events.emit(Event::BatchExpired {
            batch_id: id,
            timestamp: now,
        });
        info!(batch = %id, "batch expired");
        Ok(())
    }

    pub fn active_batches(&self) -> &[BatchId] {
        self.active.as_slice()
    }

    pub fn is_active(&self, id: BatchId) -> bool {
        self.active.contains(id)
    }

    pub fn batch_count(&self) -> usize {
        self.batches.len()
    }

    pub fn batches(&self) -> impl Iterator<Item = &Batch> {
        self.batches.iter()
    }

    pub fn batches_for_cooperative<'a>(
        &'a self,
        payment_address: &'a AccountId,
    ) -> impl Iterator<Item = &'a Batch> + 'a {
        self.batches
            .iter()
            .filter(move |b| &b.cooperative.payment_address == payment_address)
    }

    pub fn project(&self, id: BatchId) -> Option<&StagedProject> {
        self.projects.get(&id)
    }

    /// market value of everything currently in the active set
    pub fn active_inventory_value(&self) -> Money {
        self.active
            .as_slice()
            .iter()
            .filter_map(|id| self.batch(*id).ok())
            .map(Batch::inventory_value)
            .sum()
    }
}

impl CollateralBook for CollateralRegistry {
    fn batch_exists(&self, id: BatchId) -> bool {
        self.batch(id).is_ok()
    }

    fn collateral_kind(&self, id: BatchId) -> Option<CollateralKind> {
        self.batch(id).ok().map(|b| b.kind)
    }

    fn is_active(&self, id: BatchId) -> bool {
        self.active.contains(id)
    }

    fn create_staged_project(
        &mut self,
        params: StagedProjectParams,
        cooperative: Cooperative,
        associated_value: Money,
        now: DateTime<Utc>,
        events: &mut EventStore,
    ) -> Result<BatchId> {
        params.validate(now)?;

        let id = self.next_id();
        let batch = Batch {
            id,
            kind: CollateralKind::Staged,
            production_date: now,
            expiry_date: params.harvest_date,
            current_quantity: 0,
            outstanding_shares: 0,
            unit_price: Money::ZERO,
            associated_value,
            verified: false,
            metadata_verified: false,
            verified_quantity: None,
            metadata_ref: None,
            last_verified: None,
            packaging: String::new(),
            certifications: String::new(),
            cooperative,
            expired: false,
            created_at: now,
        };

        events.emit(Event::StagedProjectCreated {
            batch_id: id,
            name: params.name.clone(),
            expected_yield: params.expected_yield,
            total_stages: params.total_stages,
            harvest_date: params.harvest_date,
        });
        info!(batch = %id, project = %params.name, stages = params.total_stages, "staged project created");

        // placeholder holds no inventory yet, so it stays out of the active set
        self.batches.push(batch);
        self.projects.insert(id, StagedProject::new(id, params));
        Ok(id)
    }

    fn advance_stage(&mut self, id: BatchId, evidence_ref: &str, now: DateTime<Utc>) -> Result<u32> {
        self.projects
            .get_mut(&id)
            .ok_or_else(|| LedgerError::InvalidCollateral {
                batch: id,
                message: "not a staged project".to_string(),
            })?
            .advance(evidence_ref, now)
    }

    fn rewind_stage(&mut self, id: BatchId) {
        if let Some(project) = self.projects.get_mut(&id) {
            project.rewind();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use hourglass_rs::TimeSource;

    fn time() -> SafeTimeProvider {
        SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
        ))
    }

    fn registration(time: &SafeTimeProvider, quantity: u64) -> BatchRegistration {
        let now = time.now();
        BatchRegistration {
            production_date: now - Duration::days(2),
            expiry_date: now + Duration::days(90),
            quantity,
            unit_price: Money::from_major(3),
            associated_value: Money::from_major(3).times(quantity),
            packaging: "crates".to_string(),
            certifications: "fairtrade".to_string(),
            cooperative: Cooperative {
                name: "Umoja Maize".to_string(),
                location: "Eldoret".to_string(),
                payment_address: AccountId::new("umoja"),
                farmer_count: 85,
            },
        }
    }

    #[test]
    fn test_ids_are_sequential_from_one() {
        let time = time();
        let mut events = EventStore::new();
        let mut registry = CollateralRegistry::new();

        let a = registry.register_batch(registration(&time, 10), &time, &mut events).unwrap();
        let b = registry.register_batch(registration(&time, 20), &time, &mut events).unwrap();

        assert_eq!((a, b), (BatchId(1), BatchId(2)));
        assert!(registry.batch(BatchId(0)).is_err());
        assert!(registry.batch(BatchId(3)).is_err());
        assert_eq!(events.len(), 2);
        assert!(!registry.batch(a).unwrap().verified);
        assert_eq!(registry.batch(a).unwrap().last_verified, None);
    }

    #[test]
    fn test_retiring_middle_batch_keeps_first_and_third() {
        let time = time();
        let mut events = EventStore::new();
        let mut registry = CollateralRegistry::new();
        for q in [100, 200, 300] {
            registry.register_batch(registration(&time, q), &time, &mut events).unwrap();
        }

        let remaining = registry.retire_shares(BatchId(2), 200, &time, &mut events).unwrap();

        assert_eq!(remaining, 0);
        assert_eq!(registry.active_batches(), &[BatchId(1), BatchId(3)]);
        // never deleted, only deactivated
        assert_eq!(registry.batch(BatchId(2)).unwrap().current_quantity, 0);
        assert_eq!(registry.batch_count(), 3);
    }

    #[test]
    fn test_retire_beyond_quantity_rejected() {
        let time = time();
        let mut events = EventStore::new();
        let mut registry = CollateralRegistry::new();
        let id = registry.register_batch(registration(&time, 50), &time, &mut events).unwrap();

        let err = registry.retire_shares(id, 51, &time, &mut events).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientQuantity { id, available: 50, requested: 51 }
        );
        assert_eq!(registry.batch(id).unwrap().current_quantity, 50);
        assert!(registry.is_active(id));
    }

    #[test]
    fn test_issue_requires_verification_and_headroom() {
        let time = time();
        let mut events = EventStore::new();
        let mut registry = CollateralRegistry::new();
        let verifier = AccountId::new("auditor");
        let id = registry.register_batch(registration(&time, 100), &time, &mut events).unwrap();

        assert_eq!(
            registry.issue_shares(id, 10, &time, &mut events),
            Err(LedgerError::BatchNotVerified { id })
        );

        registry
            .verify_batch(id, 80, "ipfs://cert", &verifier, &time, &mut events)
            .unwrap();
        let batch = registry.batch(id).unwrap();
        assert_eq!(batch.current_quantity, 80);
        assert!(batch.verified && batch.metadata_verified);
        assert_eq!(batch.last_verified, Some(time.now()));

        assert_eq!(registry.issue_shares(id, 60, &time, &mut events).unwrap(), 60);
        assert!(registry.issue_shares(id, 21, &time, &mut events).is_err());
        assert_eq!(registry.issue_shares(id, 20, &time, &mut events).unwrap(), 80);

        // cannot shrink below what is tokenized
        assert!(registry.adjust_inventory(id, 79, &time, &mut events).is_err());
    }

    #[test]
    fn test_adjust_inventory_moves_active_membership() {
        let time = time();
        let mut events = EventStore::new();
        let mut registry = CollateralRegistry::new();
        let id = registry.register_batch(registration(&time, 5), &time, &mut events).unwrap();

        registry.adjust_inventory(id, 0, &time, &mut events).unwrap();
        assert!(!registry.is_active(id));

        registry.adjust_inventory(id, 12, &time, &mut events).unwrap();
        assert!(registry.is_active(id));
        assert_eq!(registry.active_batches(), &[id]);

        registry.adjust_inventory(id, 7, &time, &mut events).unwrap();
        assert_eq!(registry.active_batches().len(), 1);
    }

    #[test]
    fn test_mark_expired_only_after_expiry() {
        let time = time();
        let control = time.test_control().unwrap();
        let mut events = EventStore::new();
        let mut registry = CollateralRegistry::new();
        let id = registry.register_batch(registration(&time, 5), &time, &mut events).unwrap();

        assert!(matches!(
            registry.mark_expired(id, &time, &mut events),
            Err(LedgerError::BatchNotExpired { .. })
        ));

        control.advance(Duration::days(91));
        registry.mark_expired(id, &time, &mut events).unwrap();
        assert!(!registry.is_active(id));
        assert!(registry.batch(id).unwrap().expired);

        assert!(registry.mark_expired(id, &time, &mut events).is_err());
        assert!(registry.adjust_inventory(id, 10, &time, &mut events).is_err());
        assert!(!registry.is_active(id));
    }

    #[test]
    fn test_staged_placeholder_is_inactive() {
        let time = time();
        let mut events = EventStore::new();
        let mut registry = CollateralRegistry::new();
        let params = StagedProjectParams {
            name: "Macadamia block".to_string(),
            expected_yield: 12_000,
            harvest_date: time.now() + Duration::days(700),
            total_stages: 3,
        };
        let coop = registration(&time, 1).cooperative;

        let id = registry
            .create_staged_project(params, coop, Money::from_major(50_000), time.now(), &mut events)
            .unwrap();

        assert!(registry.is_staged(id));
        assert!(!registry.is_active(id));
        assert!(registry.retire_shares(id, 1, &time, &mut events).is_err());
        assert_eq!(registry.advance_stage(id, "ipfs://m1", time.now()).unwrap(), 1);
        registry.rewind_stage(id);
        assert_eq!(registry.project(id).unwrap().completed_stages, 0);
    }
}
