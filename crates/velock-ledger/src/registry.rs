//! Lock storage.
//!
//! [`LockRegistry`] owns every [`Lock`], indexes them by owner and keeps a
//! checkpoint trail per lock. Only the ledger obtains mutable access.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use velock_core::error::LedgerError;
use velock_core::{Address, Amount, DecayFunction, LockId, Timestamp};

use crate::lock::{ActionCounter, Holder, Lock, LockCheckpoint};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct LockRegistry {
    locks: HashMap<LockId, Lock>,
    by_owner: HashMap<Address, Vec<LockId>>,
    history: HashMap<LockId, Vec<LockCheckpoint>>,
    nonce: u64,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new undelegated lock and return its identifier.
    pub(crate) fn create(
        &mut self,
        owner: Address,
        primary: Amount,
        escrowed: Amount,
        expiry: Timestamp,
        decay: DecayFunction,
        now: Timestamp,
    ) -> LockId {
        let mut id = LockId::derive(&owner, self.nonce);
        self.nonce += 1;
        while self.locks.contains_key(&id) {
            id = LockId::derive(&owner, self.nonce);
            self.nonce += 1;
        }

        self.locks.insert(
            id,
            Lock {
                id,
                owner,
                primary,
                escrowed,
                expiry,
                decay,
                holder: Holder::Personal,
                prior_holder: Holder::Personal,
                delegation_epoch: 0,
                delegation_actions: ActionCounter::default(),
                created_at: now,
                unlocked: false,
            },
        );
        self.by_owner.entry(owner).or_default().push(id);
        id
    }

    pub fn get(&self, id: &LockId) -> Result<&Lock, LedgerError> {
        self.locks.get(id).ok_or(LedgerError::UnknownLock(*id))
    }

    pub(crate) fn get_mut(&mut self, id: &LockId) -> Result<&mut Lock, LedgerError> {
        self.locks.get_mut(id).ok_or(LedgerError::UnknownLock(*id))
    }

    /// Look up a lock that `caller` owns and that has not been unlocked.
    pub fn owned_live(&self, id: &LockId, caller: &Address) -> Result<&Lock, LedgerError> {
        let lock = self.get(id)?;
        if lock.owner != *caller {
            return Err(LedgerError::Unauthorized { caller: *caller });
        }
        if lock.unlocked {
            return Err(LedgerError::AlreadyUnlocked(*id));
        }
        Ok(lock)
    }

    /// Append the lock's current state to its checkpoint trail.
    pub(crate) fn checkpoint(&mut self, id: &LockId, now: Timestamp) -> Result<(), LedgerError> {
        let lock = self.get(id)?;
        let entry = LockCheckpoint {
            timestamp: now,
            decay: lock.decay,
            primary: lock.primary,
            escrowed: lock.escrowed,
            holder: lock.holder,
        };
        self.history.entry(*id).or_default().push(entry);
        Ok(())
    }

    pub fn history(&self, id: &LockId) -> &[LockCheckpoint] {
        self.history.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn locks_of(&self, owner: &Address) -> &[LockId] {
        self.by_owner.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lock> {
        self.locks.values()
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    fn create(reg: &mut LockRegistry, owner: Address) -> LockId {
        reg.create(owner, 10, 5, 1_000, DecayFunction::expiring(1, 1_000), 100)
    }

    #[test]
    fn create_assigns_unique_ids_and_indexes_by_owner() {
        let mut reg = LockRegistry::new();
        let a = create(&mut reg, addr(1));
        let b = create(&mut reg, addr(1));
        let c = create(&mut reg, addr(2));

        assert_ne!(a, b);
        assert_eq!(reg.len(), 3);
        assert_eq!(reg.locks_of(&addr(1)), &[a, b]);
        assert_eq!(reg.locks_of(&addr(2)), &[c]);
        assert!(reg.locks_of(&addr(3)).is_empty());

        let lock = reg.get(&a).unwrap();
        assert_eq!(lock.owner, addr(1));
        assert_eq!(lock.principal(), 15);
        assert_eq!(lock.holder, Holder::Personal);
    }

    #[test]
    fn unknown_lock_is_an_error() {
        let reg = LockRegistry::new();
        let id = LockId::derive(&addr(1), 42);
        assert_eq!(reg.get(&id).unwrap_err(), LedgerError::UnknownLock(id));
    }

    #[test]
    fn owned_live_checks_owner_then_unlocked() {
        let mut reg = LockRegistry::new();
        let id = create(&mut reg, addr(1));
        assert!(reg.owned_live(&id, &addr(1)).is_ok());
        assert_eq!(
            reg.owned_live(&id, &addr(2)).unwrap_err(),
            LedgerError::Unauthorized { caller: addr(2) }
        );

        reg.get_mut(&id).unwrap().unlocked = true;
        assert_eq!(reg.owned_live(&id, &addr(1)).unwrap_err(), LedgerError::AlreadyUnlocked(id));
    }

    #[test]
    fn checkpoints_accumulate() {
        let mut reg = LockRegistry::new();
        let id = create(&mut reg, addr(1));
        reg.checkpoint(&id, 100).unwrap();
        reg.get_mut(&id).unwrap().primary = 20;
        reg.checkpoint(&id, 150).unwrap();

        let trail = reg.history(&id);
        assert_eq!(trail.len(), 2);
        assert_eq!(trail[0].primary, 10);
        assert_eq!(trail[1].primary, 20);
        assert_eq!(trail[1].timestamp, 150);
    }

    #[test]
    fn checkpoint_of_unknown_lock_fails() {
        let mut reg = LockRegistry::new();
        let id = LockId::derive(&addr(1), 5);
        assert_eq!(reg.checkpoint(&id, 100), Err(LedgerError::UnknownLock(id)));
        assert!(reg.history(&id).is_empty());
    }
}
