use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::types::{AccountId, BatchId, CollateralKind};

/// cooperative that owns the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooperative {
    pub name: String,
    pub location: String,
    pub payment_address: AccountId,
    pub farmer_count: u32,
}

/// input for registering a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRegistration {
    pub production_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub quantity: u64,
    pub unit_price: Money,
    pub associated_value: Money,
    pub packaging: String,
    pub certifications: String,
    pub cooperative: Cooperative,
}

impl BatchRegistration {
    /// checks every creation rule against `now`
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.production_date >= self.expiry_date {
            return Err(invalid("production date must precede expiry date"));
        }
        if self.expiry_date <= now {
            return Err(invalid("expiry date must be in the future"));
        }
        if self.quantity == 0 {
            return Err(invalid("quantity must be positive"));
        }
        if !self.unit_price.is_positive() {
            return Err(invalid("unit price must be positive"));
        }
        if !self.associated_value.is_positive() {
            return Err(invalid("associated value must be positive"));
        }
        if self.cooperative.name.trim().is_empty() {
            return Err(invalid("cooperative name required"));
        }
        if self.cooperative.location.trim().is_empty() {
            return Err(invalid("cooperative location required"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> LedgerError {
    LedgerError::InvalidBatch {
        message: message.to_string(),
    }
}

/// collateral unit held by the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: BatchId,
    pub kind: CollateralKind,
    pub production_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub current_quantity: u64,
    pub outstanding_shares: u64,
    pub unit_price: Money,
    pub associated_value: Money,
    pub verified: bool,
    pub metadata_verified: bool,
    pub verified_quantity: Option<u64>,
    pub metadata_ref: Option<String>,
    pub last_verified: Option<DateTime<Utc>>,
    pub packaging: String,
    pub certifications: String,
    pub cooperative: Cooperative,
    pub expired: bool,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub(crate) fn from_registration(
        id: BatchId,
        registration: BatchRegistration,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            kind: CollateralKind::Inventory,
            production_date: registration.production_date,
            expiry_date: registration.expiry_date,
            current_quantity: registration.quantity,
            outstanding_shares: 0,
            unit_price: registration.unit_price,
            associated_value: registration.associated_value,
            verified: false,
            metadata_verified: false,
            verified_quantity: None,
            metadata_ref: None,
            last_verified: None,
            packaging: registration.packaging,
            certifications: registration.certifications,
            cooperative: registration.cooperative,
            expired: false,
            created_at: now,
        }
    }

    /// active-set membership rule
    pub fn is_active(&self) -> bool {
        self.current_quantity > 0 && !self.expired
    }

    pub fn has_passed_expiry(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry_date
    }

    /// quantity not yet tokenized into shares
    pub fn unissued_quantity(&self) -> u64 {
        self.current_quantity - self.outstanding_shares
    }

    /// unit price × current quantity
    pub fn inventory_value(&self) -> Money {
        self.unit_price.times(self.current_quantity)
    }
}
