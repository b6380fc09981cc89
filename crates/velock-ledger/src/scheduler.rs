//! Scheduled slope reductions keyed by epoch boundary.
//!
//! Every lock's expiry is an epoch boundary. When an aggregate steps onto
//! that boundary, the lock's slope stops contributing; its bias contribution
//! at that instant is exactly zero.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use velock_core::{Amount, Timestamp};

/// Map from future epoch boundary to the total slope expiring there.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct SlopeScheduler {
    entries: HashMap<Timestamp, Amount>,
}

impl SlopeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `slope` to the reduction due at `boundary`.
    pub fn schedule(&mut self, boundary: Timestamp, slope: Amount) {
        if slope == 0 {
            return;
        }
        let entry = self.entries.entry(boundary).or_insert(0);
        *entry = entry.saturating_add(slope);
    }

    /// Withdraw `slope` from the reduction due at `boundary`, dropping the
    /// entry when it reaches zero.
    pub fn cancel(&mut self, boundary: Timestamp, slope: Amount) {
        if let Some(entry) = self.entries.get_mut(&boundary) {
            *entry = entry.saturating_sub(slope);
            if *entry == 0 {
                self.entries.remove(&boundary);
            }
        }
    }

    /// Move `slope` from one boundary to another (duration extension).
    pub fn reschedule(&mut self, from: Timestamp, to: Timestamp, slope: Amount) {
        self.cancel(from, slope);
        self.schedule(to, slope);
    }

    /// Reduction due at `boundary`, without consuming it.
    pub fn get(&self, boundary: Timestamp) -> Amount {
        self.entries.get(&boundary).copied().unwrap_or(0)
    }

    /// Consume the reduction due at `boundary`.
    pub fn take(&mut self, boundary: Timestamp) -> Amount {
        self.entries.remove(&boundary).unwrap_or(0)
    }

    /// Latest boundary with a pending reduction.
    pub fn last_boundary(&self) -> Option<Timestamp> {
        self.entries.keys().copied().max()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
