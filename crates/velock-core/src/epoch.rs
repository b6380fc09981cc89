//! Epoch arithmetic.
//!
//! Epochs are fixed-length buckets counted from Unix time zero: epoch `n`
//! covers `[n * epoch_duration, (n + 1) * epoch_duration)`. Lock expiries and
//! delegation hand-overs always land on epoch boundaries.

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Pure epoch/time utility shared by the ledger and its collaborators.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochClock {
    epoch_duration: u64,
    max_lock_duration: u64,
}

impl EpochClock {
    /// Create a clock. `epoch_duration` must be non-zero; callers validate
    /// configuration before constructing one.
    pub fn new(epoch_duration: u64, max_lock_duration: u64) -> Self {
        Self {
            epoch_duration: epoch_duration.max(1),
            max_lock_duration,
        }
    }

    pub fn epoch_duration(&self) -> u64 {
        self.epoch_duration
    }

    pub fn max_lock_duration(&self) -> u64 {
        self.max_lock_duration
    }

    /// Start of the epoch containing `t`.
    ///
    /// # Examples
    ///
    /// ```
    /// use velock_core::EpochClock;
    /// let clock = EpochClock::new(100, 1_000);
    /// assert_eq!(clock.epoch_start(250), 200);
    /// assert_eq!(clock.epoch_start(300), 300);
    /// assert_eq!(clock.next_epoch_start(250), 300);
    /// ```
    pub fn epoch_start(&self, t: Timestamp) -> Timestamp {
        t - t % self.epoch_duration
    }

    /// Start of the epoch after the one containing `t` (its end boundary).
    pub fn next_epoch_start(&self, t: Timestamp) -> Timestamp {
        self.epoch_start(t).saturating_add(self.epoch_duration)
    }

    /// Index of the epoch containing `t`.
    pub fn epoch_number(&self, t: Timestamp) -> u64 {
        t / self.epoch_duration
    }

    /// First timestamp of epoch `epoch`.
    pub fn epoch_start_of(&self, epoch: u64) -> Timestamp {
        epoch.saturating_mul(self.epoch_duration)
    }

    /// End boundary of epoch `epoch`, where forward-decay reads are taken.
    pub fn epoch_end_of(&self, epoch: u64) -> Timestamp {
        epoch.saturating_add(1).saturating_mul(self.epoch_duration)
    }

    /// Whether `t` falls exactly on an epoch boundary.
    pub fn is_aligned(&self, t: Timestamp) -> bool {
        t % self.epoch_duration == 0
    }

    /// Exclusive lower bound for an expiry created or modified at `now`.
    ///
    /// An expiry must be strictly after the end of the next epoch, otherwise
    /// the lock would show no power by the next epoch end it could vote in.
    pub fn min_expiry_exclusive(&self, now: Timestamp, min_epochs: u64) -> Timestamp {
        self.epoch_start(now)
            .saturating_add(min_epochs.saturating_mul(self.epoch_duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{EPOCH_DURATION, MAX_LOCK_DURATION, MIN_EPOCHS_TO_EXPIRY};

    fn clock() -> EpochClock {
        EpochClock::new(EPOCH_DURATION, MAX_LOCK_DURATION)
    }

    #[test]
    fn epoch_start_floors() {
        let c = clock();
        let start = 1_000 * EPOCH_DURATION;
        assert_eq!(c.epoch_start(start), start);
        assert_eq!(c.epoch_start(start + 1), start);
        assert_eq!(c.epoch_start(start + EPOCH_DURATION - 1), start);
        assert_eq!(c.epoch_start(start + EPOCH_DURATION), start + EPOCH_DURATION);
    }

    #[test]
    fn epoch_numbering_matches_boundaries() {
        let c = clock();
        let t = 1_234 * EPOCH_DURATION + 17;
        let n = c.epoch_number(t);
        assert_eq!(n, 1_234);
        assert_eq!(c.epoch_start_of(n), c.epoch_start(t));
        assert_eq!(c.epoch_end_of(n), c.next_epoch_start(t));
    }

    #[test]
    fn alignment() {
        let c = clock();
        assert!(c.is_aligned(0));
        assert!(c.is_aligned(3 * EPOCH_DURATION));
        assert!(!c.is_aligned(3 * EPOCH_DURATION + 1));
    }

    #[test]
    fn min_expiry_is_end_of_next_epoch() {
        let c = clock();
        let now = 10 * EPOCH_DURATION + 5;
        assert_eq!(
            c.min_expiry_exclusive(now, MIN_EPOCHS_TO_EXPIRY),
            12 * EPOCH_DURATION
        );
    }

    #[test]
    fn saturates_instead_of_overflowing() {
        let c = clock();
        assert_eq!(c.epoch_end_of(u64::MAX), u64::MAX);
        assert_eq!(c.epoch_start_of(u64::MAX), u64::MAX);
    }

    #[test]
    fn zero_duration_is_clamped() {
        let c = EpochClock::new(0, 10);
        assert_eq!(c.epoch_duration(), 1);
    }
}
