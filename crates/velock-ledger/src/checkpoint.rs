//! Epoch-stepped settlement of aggregates.
//!
//! [`CheckpointEngine::settle`] walks an aggregate from its `last_updated`
//! boundary to the start of the current epoch one epoch at a time. At each
//! boundary it:
//!
//! 1. removes the slope of locks expiring there (their value is exactly zero),
//! 2. drains the pending delta booked for that boundary,
//! 3. records the resulting state as the checkpoint for the new epoch.
//!
//! Scheduled reductions and pending deltas are consumed when applied, so
//! settling twice at the same instant is a no-op. The walk length equals the
//! number of elapsed epochs and each step is a constant number of map lookups.

use tracing::debug;
use velock_core::{Amount, DecayFunction, EpochClock, Timestamp};

use crate::aggregate::Aggregate;
use crate::pending::PendingDelta;

/// Summary of one settlement walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SettleOutcome {
    /// Epoch boundaries crossed.
    pub epochs_advanced: u64,
    /// Total slope removed by expiries.
    pub expired_slope: Amount,
    /// Pending deltas drained.
    pub deltas_applied: u32,
}

impl SettleOutcome {
    pub fn is_noop(&self) -> bool {
        self.epochs_advanced == 0
    }
}

/// Transition of an aggregate state across one epoch boundary.
///
/// Shared by the mutating walk and by read-only projections so both agree
/// on every boundary.
pub(crate) fn advance(
    state: DecayFunction,
    boundary: Timestamp,
    expiring_slope: Amount,
    pending: Option<&PendingDelta>,
) -> DecayFunction {
    let state = state.subtract(DecayFunction::expiring(expiring_slope, boundary));
    match pending {
        Some(delta) => delta.apply(state),
        None => state,
    }
}

/// Drives aggregates forward to the current epoch.
#[derive(Clone, Copy, Debug)]
pub struct CheckpointEngine {
    clock: EpochClock,
}

impl CheckpointEngine {
    pub fn new(clock: EpochClock) -> Self {
        Self { clock }
    }

    pub fn clock(&self) -> &EpochClock {
        &self.clock
    }

    /// Settle `aggregate` up to the start of the epoch containing `now`.
    pub fn settle(&self, aggregate: &mut Aggregate, now: Timestamp) -> SettleOutcome {
        self.settle_with(aggregate, now, |_, _| {})
    }

    /// Like [`settle`](Self::settle), invoking `on_boundary` with each newly
    /// recorded checkpoint. The global aggregate uses this to finalize
    /// per-epoch total supply.
    pub fn settle_with<F>(
        &self,
        aggregate: &mut Aggregate,
        now: Timestamp,
        mut on_boundary: F,
    ) -> SettleOutcome
    where
        F: FnMut(Timestamp, &DecayFunction),
    {
        let target = self.clock.epoch_start(now);
        let step = self.clock.epoch_duration();
        let mut outcome = SettleOutcome::default();

        while aggregate.last_updated < target {
            let boundary = aggregate.last_updated + step;
            let expiring = aggregate.scheduler.take(boundary);
            let pending = aggregate.pending.take(boundary);

            aggregate.current = advance(aggregate.current, boundary, expiring, pending.as_ref());
            aggregate.last_updated = boundary;
            aggregate.history.insert(boundary, aggregate.current);
            on_boundary(boundary, &aggregate.current);

            outcome.epochs_advanced += 1;
            outcome.expired_slope = outcome.expired_slope.saturating_add(expiring);
            if pending.is_some() {
                outcome.deltas_applied += 1;
            }
        }

        if !outcome.is_noop() {
            debug!(
                last_updated = aggregate.last_updated,
                epochs = outcome.epochs_advanced,
                expired_slope = %outcome.expired_slope,
                deltas = outcome.deltas_applied,
                "checkpoint: aggregate settled"
            );
        }
        outcome
    }
}
