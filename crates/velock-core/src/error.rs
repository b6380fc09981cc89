//! Error types for the velock ledger.
use thiserror::Error;

use crate::types::{Address, Amount, LockId, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HexIdError {
    #[error("invalid hex encoding")] InvalidHex,
    #[error("invalid length: expected {expected} bytes, got {got}")] InvalidLength { expected: usize, got: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CustodyError {
    #[error("insufficient balance for {account}: have {have}, need {need}")] InsufficientBalance { account: Address, have: Amount, need: Amount },
    #[error("custody balance overflow for {0}")] BalanceOverflow(Address),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("epoch duration {got} is below the minimum {min}")] EpochTooShort { got: u64, min: u64 },
    #[error("max lock duration {max_lock_duration} is not a multiple of the epoch duration {epoch_duration}")] MisalignedMaxDuration { max_lock_duration: u64, epoch_duration: u64 },
    #[error("max lock duration spans {epochs} epochs, need at least {min}")] MaxDurationTooShort { epochs: u64, min: u64 },
    #[error("delegation action cap must be positive")] ZeroActionCap,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // validation
    #[error("invalid expiry {expiry}")] InvalidExpiry { expiry: Timestamp },
    #[error("lock expiring too soon: expiry {expiry} must be after {min_exclusive}")] LockExpiringTooSoon { expiry: Timestamp, min_exclusive: Timestamp },
    #[error("zero amount")] ZeroAmount,
    #[error("amount too small: {got} < {min}")] AmountTooSmall { got: Amount, min: Amount },
    #[error("total locked cap exceeded: {requested} > {cap}")] SupplyCapExceeded { requested: Amount, cap: Amount },
    #[error("cannot delegate to self")] SelfDelegation,
    #[error("delegate not registered: {0}")] DelegateNotRegistered(Address),
    #[error("lock already delegated to {0}")] SameDelegate(Address),
    #[error("delegation action limit reached: {count} of {max} this epoch")] ActionLimitExceeded { count: u32, max: u32 },
    #[error("clock regression: {now} < {last_seen}")] ClockRegression { now: Timestamp, last_seen: Timestamp },
    #[error("timestamp out of range: {0}")] TimestampOutOfRange(Timestamp),
    // authorization
    #[error("unauthorized caller: {caller}")] Unauthorized { caller: Address },
    // state
    #[error("unknown lock: {0}")] UnknownLock(LockId),
    #[error("lock already unlocked: {0}")] AlreadyUnlocked(LockId),
    #[error("lock not expired: expiry {expiry}, now {now}")] NotExpired { expiry: Timestamp, now: Timestamp },
    #[error("lock not delegated: {0}")] NotDelegated(LockId),
    #[error("lock already delegated: {0}")] AlreadyDelegated(LockId),
    // collaborators
    #[error(transparent)] Custody(#[from] CustodyError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("snapshot encode: {0}")] Encode(String),
    #[error("snapshot decode: {0}")] Decode(String),
    #[error("snapshot epoch duration {snapshot} does not match config {config}")] EpochMismatch { snapshot: u64, config: u64 },
    #[error("snapshot max lock duration {snapshot} does not match config {config}")] MaxLockDurationMismatch { snapshot: u64, config: u64 },
    #[error(transparent)] Config(#[from] ConfigError),
}
