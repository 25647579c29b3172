use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::types::BatchId;

/// parameters of a greenfield project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedProjectParams {
    pub name: String,
    pub expected_yield: u64,
    pub harvest_date: DateTime<Utc>,
    pub total_stages: u32,
}

/// milestone reached by a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub stage: u32,
    pub evidence_ref: String,
    pub completed_at: DateTime<Utc>,
}

/// future harvest standing in as collateral
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedProject {
    pub batch_id: BatchId,
    pub name: String,
    pub expected_yield: u64,
    pub harvest_date: DateTime<Utc>,
    pub total_stages: u32,
    pub completed_stages: u32,
    pub milestones: Vec<Milestone>,
}

impl StagedProjectParams {
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        let reject = |message: &str| {
            Err(LedgerError::InvalidBatch {
                message: message.to_string(),
            })
        };

        if self.name.trim().is_empty() {
            return reject("project name required");
        }
        if self.expected_yield == 0 {
            return reject("expected yield must be positive");
        }
        if self.total_stages == 0 {
            return reject("project needs at least one stage");
        }
        if self.harvest_date <= now {
            return reject("harvest date must be in the future");
        }
        Ok(())
    }
}

impl StagedProject {
    pub(crate) fn new(batch_id: BatchId, params: StagedProjectParams) -> Self {
        Self {
            batch_id,
            name: params.name,
            expected_yield: params.expected_yield,
            harvest_date: params.harvest_date,
            total_stages: params.total_stages,
            completed_stages: 0,
            milestones: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completed_stages >= self.total_stages
    }

    /// record the next milestone, returns the stage number reached
    pub(crate) fn advance(&mut self, evidence_ref: &str, now: DateTime<Utc>) -> Result<u32> {
        if self.is_complete() {
            return Err(LedgerError::InvalidCollateral {
                batch: self.batch_id,
                message: format!("all {} stages already completed", self.total_stages),
            });
        }
        if evidence_ref.trim().is_empty() {
            return Err(LedgerError::InvalidCollateral {
                batch: self.batch_id,
                message: "milestone evidence reference required".to_string(),
            });
        }

        self.completed_stages += 1;
        self.milestones.push(Milestone {
            stage: self.completed_stages,
            evidence_ref: evidence_ref.to_string(),
            completed_at: now,
        });
        Ok(self.completed_stages)
    }

    /// undo the most recent milestone
    pub(crate) fn rewind(&mut self) {
        if self.milestones.pop().is_some() {
            self.completed_stages -= 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn project(now: DateTime<Utc>) -> StagedProject {
        StagedProject::new(
            BatchId(9),
            StagedProjectParams {
                name: "Avocado orchard".to_string(),
                expected_yield: 40_000,
                harvest_date: now + Duration::days(900),
                total_stages: 2,
            },
        )
    }

    #[test]
    fn test_advance_until_complete() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut p = project(now);

        assert_eq!(p.advance("ipfs://land-cleared", now).unwrap(), 1);
        assert_eq!(p.advance("ipfs://seedlings", now).unwrap(), 2);
        assert!(p.is_complete());
        assert!(p.advance("ipfs://extra", now).is_err());
        assert_eq!(p.milestones.len(), 2);
    }

    #[test]
    fn test_rewind_and_empty_evidence() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut p = project(now);

        assert!(p.advance(" ", now).is_err());
        p.advance("ipfs://a", now).unwrap();
        p.rewind();
        assert_eq!(p.completed_stages, 0);
        assert!(p.milestones.is_empty());
    }

    #[test]
    fn test_params_validation() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut params = StagedProjectParams {
            name: "Cocoa".to_string(),
            expected_yield: 10,
            harvest_date: now + Duration::days(10),
            total_stages: 3,
        };
        assert!(params.validate(now).is_ok());

        params.total_stages = 0;
        assert!(params.validate(now).is_err());
    }
}
