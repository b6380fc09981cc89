//! Delegation state machine.
//!
//! Every delegation action takes effect at the next epoch boundary. The
//! holder the lock is leaving keeps its voting power for the rest of the
//! current epoch; the hand-over is queued as a pending subtraction from the
//! old holder and a pending addition to the new one. Scheduled expiries move
//! immediately, since they always live with the holder the lock is heading to.
//!
//! Several actions inside one epoch compose: each one queues against the
//! same boundary, and a reversal cancels the entry it queued.

use tracing::info;
use velock_core::error::LedgerError;
use velock_core::traits::{Custody, DelegateRegistry};
use velock_core::{Address, LockId, Timestamp};

use crate::ledger::VeLedger;
use crate::lock::{Holder, Lock};

impl<R: DelegateRegistry, C: Custody> VeLedger<R, C> {
    /// Delegate an undelegated lock to `delegate` from the next epoch.
    pub fn delegate_lock(
        &mut self,
        caller: Address,
        id: LockId,
        delegate: Address,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.check_time(now)?;
        let lock = self.state.locks.owned_live(&id, &caller)?;
        if lock.holder.is_delegated() {
            return Err(LedgerError::AlreadyDelegated(id));
        }
        self.check_delegate_target(&lock.owner, &delegate)?;
        self.check_remaining(lock.expiry, now)?;
        self.check_action_limit(lock, now)?;

        self.apply_transition(id, Holder::Delegated(delegate), now)
    }

    /// Re-point a delegated lock at `new_delegate` from the next epoch.
    pub fn switch_delegate(
        &mut self,
        caller: Address,
        id: LockId,
        new_delegate: Address,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.check_time(now)?;
        let lock = self.state.locks.owned_live(&id, &caller)?;
        match lock.holder {
            Holder::Personal => return Err(LedgerError::NotDelegated(id)),
            Holder::Delegated(d) if d == new_delegate => {
                return Err(LedgerError::SameDelegate(new_delegate));
            }
            Holder::Delegated(_) => {}
        }
        self.check_delegate_target(&lock.owner, &new_delegate)?;
        self.check_remaining(lock.expiry, now)?;
        self.check_action_limit(lock, now)?;

        self.apply_transition(id, Holder::Delegated(new_delegate), now)
    }

    /// Return a delegated lock to its owner from the next epoch.
    pub fn undelegate_lock(
        &mut self,
        caller: Address,
        id: LockId,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.check_time(now)?;
        let lock = self.state.locks.owned_live(&id, &caller)?;
        if !lock.holder.is_delegated() {
            return Err(LedgerError::NotDelegated(id));
        }
        // The reversal lands at the next boundary; the lock must still be live there.
        let boundary = self.clock().next_epoch_start(now);
        if lock.expiry <= boundary {
            return Err(LedgerError::LockExpiringTooSoon {
                expiry: lock.expiry,
                min_exclusive: boundary,
            });
        }
        self.check_action_limit(lock, now)?;

        self.apply_transition(id, Holder::Personal, now)
    }

    fn check_action_limit(&self, lock: &Lock, now: Timestamp) -> Result<(), LedgerError> {
        let count = lock
            .delegation_actions
            .count_in(self.clock().epoch_start(now));
        let max = self.config.max_delegation_actions_per_epoch;
        if count >= max {
            return Err(LedgerError::ActionLimitExceeded { count, max });
        }
        Ok(())
    }

    /// Queue the move of lock `id` to holder `to` at the next boundary.
    /// Callers validate the transition first; only the lookup can fail, and
    /// it does so before any aggregate is touched.
    pub(crate) fn apply_transition(
        &mut self,
        id: LockId,
        to: Holder,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let lock = self.state.locks.get(&id)?;
        let owner = lock.owner;
        let expiry = lock.expiry;
        let decay = lock.decay;
        let current = lock.holder_at(now);
        let from = lock.holder;

        let clock = *self.clock();
        let boundary = clock.next_epoch_start(now);

        self.touch(now);
        self.settle_global(now);
        self.settle_holder(current, owner, now);
        self.settle_holder(from, owner, now);
        self.settle_holder(to, owner, now);

        self.queue_handover(owner, from, to, boundary, decay, now);
        for key in from.aggregate_keys(owner) {
            self.aggregate_mut(key, now)
                .cancel_expiry(expiry, decay.slope);
        }
        for key in to.aggregate_keys(owner) {
            self.aggregate_mut(key, now)
                .schedule_expiry(expiry, decay.slope);
        }

        self.state
            .locks
            .get_mut(&id)?
            .record_delegation(to, now, boundary, clock.epoch_start(now));
        self.state.locks.checkpoint(&id, now)?;

        info!(
            lock = %id,
            from = %from,
            to = %to,
            effective = boundary,
            "ledger: delegation scheduled"
        );
        Ok(())
    }
}
