//! # velock-core
//! Foundation types, decay math and collaborator traits for the velock
//! voting-escrow ledger.

pub mod constants;
pub mod decay;
pub mod epoch;
pub mod error;
pub mod memory;
pub mod traits;
pub mod types;

pub use decay::DecayFunction;
pub use epoch::EpochClock;
pub use types::{Address, Amount, LockId, Timestamp};
