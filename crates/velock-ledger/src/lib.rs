//! # velock-ledger
//! Epoch-stepped voting-escrow ledger.
//!
//! Locked principal becomes a linearly decaying voting-power curve
//! ([`velock_core::DecayFunction`]). Curves are summed into a global
//! aggregate and into per-user, per-delegate and per-pair aggregates that
//! are advanced one epoch at a time by the [`CheckpointEngine`]. Delegation
//! changes are deferred by exactly one epoch through pending deltas.
//!
//! [`VeLedger`] is the entry point.

pub mod aggregate;
pub mod checkpoint;
pub mod config;
pub mod delegation;
pub mod ledger;
pub mod lock;
pub mod pending;
pub mod query;
pub mod registry;
pub mod scheduler;
pub mod state;

pub use aggregate::Aggregate;
pub use checkpoint::{CheckpointEngine, SettleOutcome};
pub use config::LedgerConfig;
pub use ledger::VeLedger;
pub use lock::{AggregateKey, DelegationPhase, Holder, Lock, LockCheckpoint};
pub use pending::{PendingDelta, PendingDeltaQueue};
pub use registry::LockRegistry;
pub use scheduler::SlopeScheduler;
pub use state::LedgerState;
