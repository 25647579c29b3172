use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{LedgerError, Result};

/// global suspend switch for mutating entry points
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitBreaker {
    paused: bool,
}

impl CircuitBreaker {
    pub fn new() -> Self {
        Self { paused: false }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// fails with `Paused` while suspended
    pub fn ensure_running(&self) -> Result<()> {
        if self.paused {
            Err(LedgerError::Paused)
        } else {
            Ok(())
        }
    }

    /// fails with `NotPaused` unless suspended
    pub fn ensure_paused(&self) -> Result<()> {
        if self.paused {
            Ok(())
        } else {
            Err(LedgerError::NotPaused)
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.paused = true;
        Ok(())
    }

    pub fn unpause(&mut self) -> Result<()> {
        self.ensure_paused()?;
        self.paused = false;
        Ok(())
    }
}

/// call-depth flag held across value-moving operations
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: bool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self { entered: false }
    }

    pub fn is_entered(&self) -> bool {
        self.entered
    }

    pub fn enter(&mut self) -> Result<()> {
        if self.entered {
            debug!("nested entry into guarded operation");
            return Err(LedgerError::Reentrancy);
        }
        self.entered = true;
        Ok(())
    }

    pub fn exit(&mut self) {
        self.entered = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaker_toggles() {
        let mut breaker = CircuitBreaker::new();
        assert!(breaker.ensure_running().is_ok());
        assert_eq!(breaker.unpause(), Err(LedgerError::NotPaused));

        breaker.pause().unwrap();
        assert!(breaker.is_paused());
        assert_eq!(breaker.ensure_running(), Err(LedgerError::Paused));
        assert_eq!(breaker.pause(), Err(LedgerError::Paused));

        breaker.unpause().unwrap();
        assert!(!breaker.is_paused());
    }

    #[test]
    fn test_guard_rejects_nested_entry() {
        let mut guard = ReentrancyGuard::new();
        guard.enter().unwrap();
        assert_eq!(guard.enter(), Err(LedgerError::Reentrancy));
        guard.exit();
        assert!(guard.enter().is_ok());
    }
}
