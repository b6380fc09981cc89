//! Ledger state and snapshots.
//!
//! [`LedgerState`] is everything a ledger owns apart from its collaborators:
//! the global aggregate, the lazily created per-user, per-delegate and
//! per-pair aggregates, the finalized supply table and the lock registry.
//! Snapshots are bincode-encoded via serde.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use velock_core::error::SnapshotError;
use velock_core::{Address, Amount, Timestamp};

use crate::aggregate::Aggregate;
use crate::lock::AggregateKey;
use crate::registry::LockRegistry;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LedgerState {
    /// Epoch length the aggregates were stepped with.
    pub(crate) epoch_duration: u64,
    /// Slope denominator every stored lock curve was built with.
    pub(crate) max_lock_duration: u64,
    pub(crate) global: Aggregate,
    pub(crate) users: HashMap<Address, Aggregate>,
    pub(crate) delegates: HashMap<Address, Aggregate>,
    /// delegate -> delegator -> aggregate
    pub(crate) pairs: HashMap<Address, HashMap<Address, Aggregate>>,
    /// Global value at each settled boundary, written once.
    pub(crate) total_supply_at: BTreeMap<Timestamp, Amount>,
    pub(crate) locks: LockRegistry,
    /// Sum of live lock principals.
    pub(crate) total_locked: Amount,
    /// Latest timestamp an operation was accepted at.
    pub(crate) last_seen: Timestamp,
}

impl LedgerState {
    /// Empty state whose global aggregate starts at `epoch_start`.
    pub fn new(epoch_duration: u64, max_lock_duration: u64, epoch_start: Timestamp) -> Self {
        Self {
            epoch_duration,
            max_lock_duration,
            global: Aggregate::new(epoch_start),
            users: HashMap::new(),
            delegates: HashMap::new(),
            pairs: HashMap::new(),
            total_supply_at: BTreeMap::new(),
            locks: LockRegistry::new(),
            total_locked: 0,
            last_seen: epoch_start,
        }
    }

    pub fn epoch_duration(&self) -> u64 {
        self.epoch_duration
    }

    pub fn max_lock_duration(&self) -> u64 {
        self.max_lock_duration
    }

    pub fn global(&self) -> &Aggregate {
        &self.global
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn total_locked(&self) -> Amount {
        self.total_locked
    }

    pub fn last_seen(&self) -> Timestamp {
        self.last_seen
    }

    pub fn total_supply_table(&self) -> &BTreeMap<Timestamp, Amount> {
        &self.total_supply_at
    }

    /// Aggregate at `key`, if it has ever been touched.
    pub fn aggregate(&self, key: &AggregateKey) -> Option<&Aggregate> {
        match key {
            AggregateKey::User(a) => self.users.get(a),
            AggregateKey::Delegate(d) => self.delegates.get(d),
            AggregateKey::Pair {
                delegator,
                delegate,
            } => self.pairs.get(delegate).and_then(|m| m.get(delegator)),
        }
    }

    /// Aggregate at `key`, created settled to `epoch_start` if missing.
    pub(crate) fn aggregate_entry(
        &mut self,
        key: AggregateKey,
        epoch_start: Timestamp,
    ) -> &mut Aggregate {
        match key {
            AggregateKey::User(a) => self
                .users
                .entry(a)
                .or_insert_with(|| Aggregate::new(epoch_start)),
            AggregateKey::Delegate(d) => self
                .delegates
                .entry(d)
                .or_insert_with(|| Aggregate::new(epoch_start)),
            AggregateKey::Pair {
                delegator,
                delegate,
            } => self
                .pairs
                .entry(delegate)
                .or_default()
                .entry(delegator)
                .or_insert_with(|| Aggregate::new(epoch_start)),
        }
    }

    pub fn users(&self) -> impl Iterator<Item = (&Address, &Aggregate)> {
        self.users.iter()
    }

    pub fn delegates(&self) -> impl Iterator<Item = (&Address, &Aggregate)> {
        self.delegates.iter()
    }

    /// Pair aggregates of `delegate`, keyed by delegator.
    pub fn pairs_of(&self, delegate: &Address) -> impl Iterator<Item = (&Address, &Aggregate)> {
        self.pairs.get(delegate).into_iter().flat_map(|m| m.iter())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serde::encode_to_vec(self, bincode::config::standard())
            .map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let (state, _) = bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| SnapshotError::Decode(e.to_string()))?;
        Ok(state)
    }
}
