//! Voting-power aggregates.
//!
//! An [`Aggregate`] is the sum of the decay curves of every lock attributed
//! to it, plus the bookkeeping needed to advance that sum through time: a
//! [`SlopeScheduler`] for expiries, a [`PendingDeltaQueue`] for deferred
//! delegation effects and a per-boundary checkpoint history.
//!
//! The ledger keeps one global aggregate and, lazily, one per user pocket,
//! per delegate pocket and per `(delegator, delegate)` pair. Each instance is
//! self-contained and can be driven directly through
//! [`CheckpointEngine`](crate::checkpoint::CheckpointEngine).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use velock_core::{Amount, DecayFunction, EpochClock, Timestamp};

use crate::checkpoint::advance;
use crate::pending::PendingDeltaQueue;
use crate::scheduler::SlopeScheduler;

/// Running sum of attributed decay curves.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Aggregate {
    pub(crate) current: DecayFunction,
    /// Epoch boundary this aggregate has been settled to.
    pub(crate) last_updated: Timestamp,
    pub(crate) scheduler: SlopeScheduler,
    pub(crate) pending: PendingDeltaQueue,
    /// Epoch start -> state in force during that epoch.
    pub(crate) history: BTreeMap<Timestamp, DecayFunction>,
}

impl Aggregate {
    /// Create an empty aggregate settled to `epoch_start`.
    pub fn new(epoch_start: Timestamp) -> Self {
        Self {
            current: DecayFunction::ZERO,
            last_updated: epoch_start,
            scheduler: SlopeScheduler::new(),
            pending: PendingDeltaQueue::new(),
            history: BTreeMap::from([(epoch_start, DecayFunction::ZERO)]),
        }
    }

    pub fn current(&self) -> DecayFunction {
        self.current
    }

    pub fn last_updated(&self) -> Timestamp {
        self.last_updated
    }

    pub fn scheduler(&self) -> &SlopeScheduler {
        &self.scheduler
    }

    pub fn pending(&self) -> &PendingDeltaQueue {
        &self.pending
    }

    pub fn history(&self) -> &BTreeMap<Timestamp, DecayFunction> {
        &self.history
    }

    /// Recorded state for the epoch starting at `epoch_start`, if any.
    pub fn checkpoint(&self, epoch_start: Timestamp) -> Option<DecayFunction> {
        self.history.get(&epoch_start).copied()
    }

    /// Add `curve` immediately. The aggregate must already be settled.
    pub fn add(&mut self, curve: DecayFunction) {
        self.current += curve;
        self.history.insert(self.last_updated, self.current);
    }

    /// Remove `curve` immediately. The aggregate must already be settled.
    pub fn subtract(&mut self, curve: DecayFunction) {
        self.current -= curve;
        self.history.insert(self.last_updated, self.current);
    }

    /// Book `slope` to stop contributing at `expiry`.
    pub fn schedule_expiry(&mut self, expiry: Timestamp, slope: Amount) {
        self.scheduler.schedule(expiry, slope);
    }

    /// Withdraw a previously booked expiry.
    pub fn cancel_expiry(&mut self, expiry: Timestamp, slope: Amount) {
        self.scheduler.cancel(expiry, slope);
    }

    /// Move a booked expiry to a later boundary.
    pub fn reschedule_expiry(&mut self, from: Timestamp, to: Timestamp, slope: Amount) {
        self.scheduler.reschedule(from, to, slope);
    }

    /// Defer adding `curve` until `boundary`.
    pub fn queue_addition(&mut self, boundary: Timestamp, curve: DecayFunction) {
        self.pending.queue_addition(boundary, curve);
    }

    /// Defer removing `curve` until `boundary`.
    pub fn queue_subtraction(&mut self, boundary: Timestamp, curve: DecayFunction) {
        self.pending.queue_subtraction(boundary, curve);
    }

    /// State in force during the epoch starting at `epoch_start`.
    ///
    /// Past epochs come from history. Current and future epochs are projected
    /// forward from `current` by applying scheduled expiries and queued deltas
    /// on a copy; nothing is mutated.
    pub fn state_in_epoch(&self, epoch_start: Timestamp, epoch_duration: u64) -> DecayFunction {
        if epoch_start < self.last_updated {
            return self
                .history
                .range(..=epoch_start)
                .next_back()
                .map(|(_, state)| *state)
                .unwrap_or_default();
        }

        // Nothing changes past the last booked boundary.
        let horizon = match (self.scheduler.last_boundary(), self.pending.last_boundary()) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        let stop = horizon.map_or(self.last_updated, |h| h.min(epoch_start));

        let mut state = self.current;
        let mut boundary = self.last_updated;
        while boundary < stop {
            boundary += epoch_duration;
            state = advance(
                state,
                boundary,
                self.scheduler.get(boundary),
                self.pending.get(boundary),
            );
        }
        state
    }

    /// Voting power at `t`, using the state in force during `t`'s epoch.
    pub fn value_at(&self, t: Timestamp, clock: &EpochClock) -> Amount {
        self.state_in_epoch(clock.epoch_start(t), clock.epoch_duration())
            .evaluate(t)
    }

    /// Forward-decay read: the state in force during `epoch`, evaluated at its end.
    pub fn value_at_epoch_end(&self, epoch: u64, clock: &EpochClock) -> Amount {
        self.state_in_epoch(clock.epoch_start_of(epoch), clock.epoch_duration())
            .evaluate(clock.epoch_end_of(epoch))
    }
}
