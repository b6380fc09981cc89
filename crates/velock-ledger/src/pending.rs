//! Deferred aggregate adjustments.
//!
//! Delegation changes never take effect in the epoch they are made in. They
//! are booked as a [`PendingDelta`] against the next epoch boundary and
//! drained exactly once when the owning aggregate is settled past it.
//! Personal, delegate and per-pair aggregates all use the same queue type.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use velock_core::{DecayFunction, Timestamp};

/// Additions and subtractions due at one epoch boundary.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PendingDelta {
    pub additions: DecayFunction,
    pub subtractions: DecayFunction,
}

impl PendingDelta {
    /// Apply to `state`: additions first, so intermediate values never clamp.
    pub fn apply(&self, state: DecayFunction) -> DecayFunction {
        state.combine(self.additions).subtract(self.subtractions)
    }

    /// Whether applying this delta leaves any state unchanged.
    pub fn is_neutral(&self) -> bool {
        self.additions == self.subtractions
    }
}

/// Per-aggregate queue of [`PendingDelta`]s keyed by epoch boundary.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingDeltaQueue {
    entries: HashMap<Timestamp, PendingDelta>,
}

impl PendingDeltaQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Book an addition due at `boundary`.
    pub fn queue_addition(&mut self, boundary: Timestamp, curve: DecayFunction) {
        if curve.is_zero() {
            return;
        }
        self.entries.entry(boundary).or_default().additions += curve;
        self.drop_if_neutral(boundary);
    }

    /// Book a subtraction due at `boundary`.
    pub fn queue_subtraction(&mut self, boundary: Timestamp, curve: DecayFunction) {
        if curve.is_zero() {
            return;
        }
        self.entries.entry(boundary).or_default().subtractions += curve;
        self.drop_if_neutral(boundary);
    }

    /// Delta due at `boundary`, without consuming it.
    pub fn get(&self, boundary: Timestamp) -> Option<&PendingDelta> {
        self.entries.get(&boundary)
    }

    /// Consume the delta due at `boundary`.
    pub fn take(&mut self, boundary: Timestamp) -> Option<PendingDelta> {
        self.entries.remove(&boundary)
    }

    /// Latest boundary with a queued delta.
    pub fn last_boundary(&self) -> Option<Timestamp> {
        self.entries.keys().copied().max()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A delegation reversed within the same epoch books opposite curves
    /// against one boundary; the net entry is removed.
    fn drop_if_neutral(&mut self, boundary: Timestamp) {
        if self.entries.get(&boundary).is_some_and(PendingDelta::is_neutral) {
            self.entries.remove(&boundary);
        }
    }
}
