//! Read side of the ledger.
//!
//! Reads never mutate. Epochs an aggregate has already settled past are
//! served from its checkpoint history; later epochs are projected forward
//! on a copy, so a read gives the same answer before and after the
//! aggregates are settled.

use velock_core::error::LedgerError;
use velock_core::traits::{Custody, DelegateRegistry};
use velock_core::{Address, Amount, LockId, Timestamp};

use crate::aggregate::Aggregate;
use crate::ledger::VeLedger;
use crate::lock::{AggregateKey, DelegationPhase, Lock, LockCheckpoint};

impl<R: DelegateRegistry, C: Custody> VeLedger<R, C> {
    /// Voting power of `address` at `t`: its personal pocket, plus the
    /// power delegated to it when `include_delegated` is set.
    pub fn balance_of_at(&self, address: &Address, include_delegated: bool, t: Timestamp) -> Amount {
        let clock = self.clock();
        let personal = self
            .state
            .aggregate(&AggregateKey::User(*address))
            .map_or(0, |agg| agg.value_at(t, clock));
        if !include_delegated {
            return personal;
        }
        let delegated = self
            .state
            .aggregate(&AggregateKey::Delegate(*address))
            .map_or(0, |agg| agg.value_at(t, clock));
        personal.saturating_add(delegated)
    }

    /// Forward-decay vote weight of `address` for `epoch`.
    pub fn balance_at_epoch_end(&self, address: &Address, epoch: u64, include_delegated: bool) -> Amount {
        let personal = self.epoch_end_value(&AggregateKey::User(*address), epoch);
        if !include_delegated {
            return personal;
        }
        personal.saturating_add(self.epoch_end_value(&AggregateKey::Delegate(*address), epoch))
    }

    pub fn lock_voting_power_at(&self, id: &LockId, t: Timestamp) -> Result<Amount, LedgerError> {
        Ok(self.state.locks.get(id)?.voting_power_at(t))
    }

    /// Power `delegator` has delegated to `delegate`, read at the end of `epoch`.
    pub fn specific_delegated_balance_at_epoch_end(
        &self,
        delegator: &Address,
        delegate: &Address,
        epoch: u64,
    ) -> Amount {
        self.epoch_end_value(
            &AggregateKey::Pair {
                delegator: *delegator,
                delegate: *delegate,
            },
            epoch,
        )
    }

    /// Finalized total supply keyed by boundary timestamp, not epoch number.
    /// `None` until the global aggregate has been settled onto `boundary`.
    pub fn total_supply_at(&self, boundary: Timestamp) -> Option<Amount> {
        self.state.total_supply_at.get(&boundary).copied()
    }

    /// Finalized total supply at the start of `epoch`.
    pub fn total_supply_at_epoch(&self, epoch: u64) -> Option<Amount> {
        self.total_supply_at(self.clock().epoch_start_of(epoch))
    }

    pub fn total_supply_at_epoch_end(&self, epoch: u64) -> Amount {
        self.state.global.value_at_epoch_end(epoch, self.clock())
    }

    pub fn total_supply_at_timestamp(&self, t: Timestamp) -> Amount {
        self.state.global.value_at(t, self.clock())
    }

    pub fn lock(&self, id: &LockId) -> Result<&Lock, LedgerError> {
        self.state.locks.get(id)
    }

    pub fn locks_of(&self, owner: &Address) -> &[LockId] {
        self.state.locks.locks_of(owner)
    }

    pub fn lock_history(&self, id: &LockId) -> &[LockCheckpoint] {
        self.state.locks.history(id)
    }

    pub fn delegation_phase(&self, id: &LockId, t: Timestamp) -> Result<DelegationPhase, LedgerError> {
        Ok(self.state.locks.get(id)?.phase_at(t))
    }

    pub fn aggregate(&self, key: &AggregateKey) -> Option<&Aggregate> {
        self.state.aggregate(key)
    }

    pub fn global(&self) -> &Aggregate {
        &self.state.global
    }

    pub fn total_locked(&self) -> Amount {
        self.state.total_locked
    }

    fn epoch_end_value(&self, key: &AggregateKey, epoch: u64) -> Amount {
        self.state
            .aggregate(key)
            .map_or(0, |agg| agg.value_at_epoch_end(epoch, self.clock()))
    }
}
