use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::InterestConfig;
use crate::decimal::{Money, Rate, BPS_DENOMINATOR};

/// interest calculation result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestCalculation {
    pub interest_amount: Money,
    pub principal_base: Money,
    pub rate: Rate,
    pub elapsed_secs: i64,
}

/// simple (non-compounding) interest over seconds of a fixed-length year.
/// recomputed on demand from principal, rate and the two timestamps, so
/// there is no stored accrual to drift
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimpleInterest {
    seconds_per_year: i64,
}

impl SimpleInterest {
    pub fn new(seconds_per_year: i64) -> Self {
        Self { seconds_per_year }
    }

    pub fn from_config(config: &InterestConfig) -> Self {
        Self::new(config.seconds_per_year)
    }

    /// principal × bps × elapsed / (seconds_per_year × 10000)
    pub fn calculate(
        &self,
        principal: Money,
        rate: Rate,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> InterestCalculation {
        let elapsed_secs = (end - start).num_seconds().max(0);

        let interest_amount = if elapsed_secs == 0 || principal.is_zero() || rate == Rate::ZERO {
            Money::ZERO
        } else {
            let numerator = principal.as_decimal()
                * Decimal::from(rate.bps())
                * Decimal::from(elapsed_secs);
            let denominator =
                Decimal::from(self.seconds_per_year) * Decimal::from(BPS_DENOMINATOR);
            Money::from_decimal(numerator / denominator)
        };

        InterestCalculation {
            interest_amount,
            principal_base: principal,
            rate,
            elapsed_secs,
        }
    }
}
