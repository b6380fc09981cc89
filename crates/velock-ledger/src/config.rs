//! Ledger configuration.
//!
//! [`LedgerConfig`] carries the three protocol parameters that are fixed for
//! the lifetime of a ledger. Defaults match the production constants in
//! [`velock_core::constants`].

use serde::{Deserialize, Serialize};
use velock_core::EpochClock;
use velock_core::constants::{
    EPOCH_DURATION, MAX_DELEGATION_ACTIONS_PER_EPOCH, MAX_LOCK_DURATION, MIN_EPOCH_DURATION,
    MIN_EPOCHS_TO_EXPIRY,
};
use velock_core::error::ConfigError;

/// Protocol parameters of a ledger instance.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct LedgerConfig {
    /// Epoch length in seconds.
    pub epoch_duration: u64,
    /// Longest lock in seconds; a whole number of epochs.
    pub max_lock_duration: u64,
    /// Delegation actions allowed per lock per epoch.
    pub max_delegation_actions_per_epoch: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            epoch_duration: EPOCH_DURATION,
            max_lock_duration: MAX_LOCK_DURATION,
            max_delegation_actions_per_epoch: MAX_DELEGATION_ACTIONS_PER_EPOCH,
        }
    }
}

impl LedgerConfig {
    /// Check the parameters for internal consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.epoch_duration < MIN_EPOCH_DURATION {
            return Err(ConfigError::EpochTooShort {
                got: self.epoch_duration,
                min: MIN_EPOCH_DURATION,
            });
        }
        if self.max_lock_duration % self.epoch_duration != 0 {
            return Err(ConfigError::MisalignedMaxDuration {
                max_lock_duration: self.max_lock_duration,
                epoch_duration: self.epoch_duration,
            });
        }
        let epochs = self.max_lock_epochs();
        if epochs <= MIN_EPOCHS_TO_EXPIRY {
            return Err(ConfigError::MaxDurationTooShort {
                epochs,
                min: MIN_EPOCHS_TO_EXPIRY + 1,
            });
        }
        if self.max_delegation_actions_per_epoch == 0 {
            return Err(ConfigError::ZeroActionCap);
        }
        Ok(())
    }

    /// Number of epochs spanned by the longest lock.
    pub fn max_lock_epochs(&self) -> u64 {
        self.max_lock_duration / self.epoch_duration.max(1)
    }

    pub fn clock(&self) -> EpochClock {
        EpochClock::new(self.epoch_duration, self.max_lock_duration)
    }
}
