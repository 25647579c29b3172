use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::access::Role;
use crate::decimal::Money;
use crate::types::{AccountId, BatchId, LoanId, LoanKind};

/// notifications published for off-chain indexers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // collateral events
    BatchRegistered {
        batch_id: BatchId,
        cooperative: String,
        payment_address: AccountId,
        quantity: u64,
        unit_price: Money,
        expiry_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    BatchVerified {
        batch_id: BatchId,
        verifier: AccountId,
        verified_quantity: u64,
        metadata_ref: String,
        timestamp: DateTime<Utc>,
    },
    SharesIssued {
        batch_id: BatchId,
        amount: u64,
        outstanding_shares: u64,
        timestamp: DateTime<Utc>,
    },
    SharesRetired {
        batch_id: BatchId,
        amount: u64,
        remaining_quantity: u64,
        timestamp: DateTime<Utc>,
    },
    InventoryAdjusted {
        batch_id: BatchId,
        old_quantity: u64,
        new_quantity: u64,
        timestamp: DateTime<Utc>,
    },
    BatchExpired {
        batch_id: BatchId,
        timestamp: DateTime<Utc>,
    },
    StagedProjectCreated {
        batch_id: BatchId,
        name: String,
        expected_yield: u64,
        total_stages: u32,
        harvest_date: DateTime<Utc>,
    },

    // loan lifecycle events
    LoanCreated {
        loan_id: LoanId,
        kind: LoanKind,
        counterparty: AccountId,
        amount: Money,
        rate_bps: u32,
        maturity_time: DateTime<Utc>,
        batches: Vec<BatchId>,
    },
    LoanDisbursed {
        loan_id: LoanId,
        counterparty: AccountId,
        amount: Money,
        total_disbursed: Money,
        timestamp: DateTime<Utc>,
    },
    StageCompleted {
        loan_id: LoanId,
        batch_id: BatchId,
        stage: u32,
        evidence_ref: String,
        timestamp: DateTime<Utc>,
    },
    RepaymentReceived {
        loan_id: LoanId,
        amount: Money,
        total_repaid: Money,
        remaining: Money,
        timestamp: DateTime<Utc>,
    },
    LoanRepaid {
        loan_id: LoanId,
        total_repaid: Money,
        released_batches: Vec<BatchId>,
        timestamp: DateTime<Utc>,
    },
    LoanDefaulted {
        loan_id: LoanId,
        outstanding: Money,
        timestamp: DateTime<Utc>,
    },
    LoanLiquidated {
        loan_id: LoanId,
        batches: Vec<BatchId>,
        outstanding: Money,
        timestamp: DateTime<Utc>,
    },

    // access and safety events
    RoleGranted {
        account: AccountId,
        role: Role,
        granted_by: AccountId,
    },
    RoleRevoked {
        account: AccountId,
        role: Role,
        revoked_by: AccountId,
    },
    Paused {
        by: AccountId,
        timestamp: DateTime<Utc>,
    },
    Unpaused {
        by: AccountId,
        timestamp: DateTime<Utc>,
    },
    EmergencyWithdrawal {
        to: AccountId,
        amount: Money,
        by: AccountId,
        timestamp: DateTime<Utc>,
    },
}

/// event plus its outbox envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub sequence: u64,
    pub event: Event,
}

/// append-only outbox drained by indexing collaborators
#[derive(Debug, Default)]
pub struct EventStore {
    records: Vec<EventRecord>,
    next_sequence: u64,
}

impl EventStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_sequence: 1,
        }
    }

    pub fn emit(&mut self, event: Event) {
        // sequence keeps counting across drains
        let sequence = self.next_sequence.max(1);
        self.next_sequence = sequence + 1;
        self.records.push(EventRecord {
            id: Uuid::new_v4(),
            sequence,
            event,
        });
    }

    pub fn take_events(&mut self) -> Vec<EventRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn events(&self) -> &[EventRecord] {
        &self.records
    }

    /// last published event, if any
    pub fn last(&self) -> Option<&Event> {
        self.records.last().map(|r| &r.event)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expired(id: u64) -> Event {
        Event::BatchExpired {
            batch_id: BatchId(id),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_sequence_survives_drain() {
        let mut store = EventStore::new();
        store.emit(expired(1));
        store.emit(expired(2));

        let first = store.take_events();
        assert_eq!(first.iter().map(|r| r.sequence).collect::<Vec<_>>(), vec![1, 2]);
        assert!(store.is_empty());

        store.emit(expired(3));
        assert_eq!(store.events()[0].sequence, 3);
    }

    #[test]
    fn test_default_store_starts_at_one() {
        let mut store = EventStore::default();
        store.emit(expired(7));
        assert_eq!(store.events()[0].sequence, 1);
        assert!(matches!(store.last(), Some(Event::BatchExpired { batch_id: BatchId(7), .. })));
    }
}
