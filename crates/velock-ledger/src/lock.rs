//! Lock records and the per-lock delegation state machine.
//!
//! ```text
//! Undelegated --delegate--> PendingDelegation --boundary--> ActiveDelegation
//! ActiveDelegation --switch--> PendingDelegation (new delegate)
//! ActiveDelegation --undelegate--> PendingUndelegation --boundary--> Undelegated
//! any --unlock (after expiry)--> unlocked
//! ```
//!
//! A lock records the holder it is moving to (`holder`), the holder it is
//! moving from (`prior_holder`) and the boundary at which the move takes
//! effect (`delegation_epoch`). Phase transitions at a boundary need no
//! action on the lock; the aggregates see them through their pending queues.

use std::fmt;

use serde::{Deserialize, Serialize};
use velock_core::{Address, Amount, DecayFunction, LockId, Timestamp};

/// Pocket a lock's voting power is attributed to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Holder {
    /// The owner's personal aggregate.
    #[default]
    Personal,
    /// The delegate's aggregate (and the owner/delegate pair aggregate).
    Delegated(Address),
}

impl Holder {
    pub fn delegate(&self) -> Option<Address> {
        match self {
            Self::Personal => None,
            Self::Delegated(d) => Some(*d),
        }
    }

    pub fn is_delegated(&self) -> bool {
        matches!(self, Self::Delegated(_))
    }

    /// Aggregates that carry a lock of `owner` attributed to this holder.
    pub fn aggregate_keys(&self, owner: Address) -> Vec<AggregateKey> {
        match self {
            Self::Personal => vec![AggregateKey::User(owner)],
            Self::Delegated(d) => vec![
                AggregateKey::Delegate(*d),
                AggregateKey::Pair {
                    delegator: owner,
                    delegate: *d,
                },
            ],
        }
    }
}

impl fmt::Display for Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Personal => write!(f, "personal"),
            Self::Delegated(d) => write!(f, "delegate:{d}"),
        }
    }
}

/// Address of a non-global aggregate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AggregateKey {
    User(Address),
    Delegate(Address),
    Pair { delegator: Address, delegate: Address },
}

/// Delegation phase of a lock at a given time.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelegationPhase {
    Undelegated,
    PendingDelegation,
    ActiveDelegation,
    PendingUndelegation,
}

/// Delegation actions taken on a lock during one epoch.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionCounter {
    pub epoch_start: Timestamp,
    pub count: u32,
}

impl ActionCounter {
    /// Actions already taken in the epoch starting at `epoch_start`.
    pub fn count_in(&self, epoch_start: Timestamp) -> u32 {
        if self.epoch_start == epoch_start {
            self.count
        } else {
            0
        }
    }

    pub fn record(&mut self, epoch_start: Timestamp) {
        if self.epoch_start == epoch_start {
            self.count = self.count.saturating_add(1);
        } else {
            *self = Self { epoch_start, count: 1 };
        }
    }
}

/// A principal lock.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Lock {
    pub id: LockId,
    pub owner: Address,
    /// Primary-asset principal.
    pub primary: Amount,
    /// Escrowed-asset principal. Redeemed separately, votes like primary.
    pub escrowed: Amount,
    /// Epoch-aligned expiry.
    pub expiry: Timestamp,
    /// Curve of the combined principal.
    pub decay: DecayFunction,
    /// Holder from `delegation_epoch` onwards.
    pub holder: Holder,
    /// Holder before `delegation_epoch`.
    pub prior_holder: Holder,
    /// Boundary at which `holder` takes over; 0 if never delegated.
    pub delegation_epoch: Timestamp,
    pub delegation_actions: ActionCounter,
    pub created_at: Timestamp,
    pub unlocked: bool,
}

impl Lock {
    /// Principal counted for voting power.
    pub fn principal(&self) -> Amount {
        self.primary.saturating_add(self.escrowed)
    }

    /// Target delegate, effective or pending.
    pub fn delegate(&self) -> Option<Address> {
        self.holder.delegate()
    }

    /// Holder whose aggregate carries this lock at `t`.
    pub fn holder_at(&self, t: Timestamp) -> Holder {
        if t >= self.delegation_epoch {
            self.holder
        } else {
            self.prior_holder
        }
    }

    pub fn phase_at(&self, t: Timestamp) -> DelegationPhase {
        let current = self.holder_at(t);
        match (current, self.holder) {
            (Holder::Personal, Holder::Personal) => DelegationPhase::Undelegated,
            (Holder::Delegated(_), Holder::Personal) => DelegationPhase::PendingUndelegation,
            (c, target) if c == target => DelegationPhase::ActiveDelegation,
            _ => DelegationPhase::PendingDelegation,
        }
    }

    pub fn voting_power_at(&self, t: Timestamp) -> Amount {
        self.decay.evaluate(t)
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expiry
    }

    /// Point the lock at `new_holder` from `boundary` onwards.
    ///
    /// If an earlier change is still pending, the lock keeps its original
    /// prior holder: the aggregates have not seen that change yet.
    pub(crate) fn record_delegation(
        &mut self,
        new_holder: Holder,
        now: Timestamp,
        boundary: Timestamp,
        epoch_start: Timestamp,
    ) {
        if self.delegation_epoch <= now {
            self.prior_holder = self.holder;
        }
        self.holder = new_holder;
        self.delegation_epoch = boundary;
        self.delegation_actions.record(epoch_start);
    }
}

/// Snapshot of a lock taken after every mutation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LockCheckpoint {
    pub timestamp: Timestamp,
    pub decay: DecayFunction,
    pub primary: Amount,
    pub escrowed: Amount,
    pub holder: Holder,
}
