use chrono::Duration;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LedgerError, Result};

/// seconds in the 365-day interest year
pub const SECONDS_PER_YEAR: i64 = 365 * 24 * 60 * 60;

/// ledger configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub loan_limits: LoanLimits,
    pub staged_limits: LoanLimits,
    pub interest: InterestConfig,
}

/// bounds enforced at loan creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanLimits {
    pub minimum_amount: Money,
    pub max_duration_secs: i64,
    pub max_rate: Rate,
}

/// interest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestConfig {
    /// denominator of the simple-interest formula
    pub seconds_per_year: i64,
}

impl LoanLimits {
    pub fn max_duration(&self) -> Duration {
        Duration::seconds(self.max_duration_secs)
    }
}

impl LedgerConfig {
    /// defaults used by the cooperative programme: 1,000 minimum, five
    /// year / 20% ceiling for inventory loans, ten year / 30% for greenfield
    pub fn cooperative_default() -> Self {
        Self {
            loan_limits: LoanLimits {
                minimum_amount: Money::from_major(1_000),
                max_duration_secs: 5 * SECONDS_PER_YEAR,
                max_rate: Rate::from_bps(2_000),
            },
            staged_limits: LoanLimits {
                minimum_amount: Money::from_major(1_000),
                max_duration_secs: 10 * SECONDS_PER_YEAR,
                max_rate: Rate::from_bps(3_000),
            },
            interest: InterestConfig {
                seconds_per_year: SECONDS_PER_YEAR,
            },
        }
    }

    /// parse from json and validate
    pub fn from_json(json: &str) -> Result<Self> {
        let config: LedgerConfig =
            serde_json::from_str(json).map_err(|e| LedgerError::InvalidConfiguration {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("JSON error: {}", e))
    }

    pub fn validate(&self) -> Result<()> {
        for (label, limits) in [("loan", &self.loan_limits), ("staged", &self.staged_limits)] {
            if !limits.minimum_amount.is_positive() {
                return Err(LedgerError::InvalidConfiguration {
                    message: format!("{} minimum amount must be positive", label),
                });
            }
            if limits.max_duration_secs <= 0 {
                return Err(LedgerError::InvalidConfiguration {
                    message: format!("{} duration ceiling must be positive", label),
                });
            }
            // a rate above 100% per year is never a valid ceiling
            if limits.max_rate.as_decimal() > dec!(1) {
                return Err(LedgerError::InvalidConfiguration {
                    message: format!("{} rate ceiling {} above 100%", label, limits.max_rate),
                });
            }
        }

        if self.interest.seconds_per_year <= 0 {
            return Err(LedgerError::InvalidConfiguration {
                message: "seconds per year must be positive".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::cooperative_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LedgerConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.staged_limits.max_rate > config.loan_limits.max_rate);
        assert!(config.staged_limits.max_duration_secs > config.loan_limits.max_duration_secs);
    }

    #[test]
    fn test_json_round_trip_and_validation() {
        let json = LedgerConfig::default().to_json_pretty();
        let parsed = LedgerConfig::from_json(&json).unwrap();
        assert_eq!(parsed, LedgerConfig::default());

        let mut bad = LedgerConfig::default();
        bad.loan_limits.max_rate = Rate::from_bps(15_000);
        let err = LedgerConfig::from_json(&bad.to_json_pretty()).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            LedgerConfig::from_json("{ not json"),
            Err(LedgerError::InvalidConfiguration { .. })
        ));
    }
}
