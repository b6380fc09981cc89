//! Protocol constants. All token magnitudes are in base units (1 token = 10^18 units).

/// One whole token in base units.
pub const TOKEN: u128 = 1_000_000_000_000_000_000;

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Length of one epoch: 28 days.
///
/// # Examples
///
/// ```
/// use velock_core::constants::{EPOCH_DURATION, SECONDS_PER_DAY};
/// assert_eq!(EPOCH_DURATION, 28 * SECONDS_PER_DAY);
/// ```
pub const EPOCH_DURATION: u64 = 28 * SECONDS_PER_DAY;

/// Number of epochs in the maximum lock duration.
pub const MAX_LOCK_EPOCHS: u64 = 26;

/// Maximum lock duration: two years, rounded down to whole epochs (728 days).
///
/// Every lock's slope is `principal / MAX_LOCK_DURATION`, so a lock of the
/// maximum length starts with voting power equal to its principal.
///
/// # Examples
///
/// ```
/// use velock_core::constants::{EPOCH_DURATION, MAX_LOCK_DURATION};
/// assert_eq!(MAX_LOCK_DURATION % EPOCH_DURATION, 0);
/// assert_eq!(MAX_LOCK_DURATION / 86_400, 728);
/// ```
pub const MAX_LOCK_DURATION: u64 = MAX_LOCK_EPOCHS * EPOCH_DURATION;

/// Minimum number of whole epochs between the current epoch's start and a
/// lock's expiry, exclusive. An expiry must be strictly after the end of the
/// next epoch, otherwise the lock has no usable voting epoch left.
pub const MIN_EPOCHS_TO_EXPIRY: u64 = 2;

/// Default cap on delegation actions (delegate, switch, undelegate) per lock per epoch.
pub const MAX_DELEGATION_ACTIONS_PER_EPOCH: u32 = 2;

/// Upper bound on principal locked across the whole ledger: 10^12 tokens.
pub const MAX_TOTAL_LOCKED: u128 = 1_000_000_000_000 * TOKEN;

/// Latest timestamp the ledger accepts for operations and expiries (~year 36812).
///
/// Together with [`MAX_TOTAL_LOCKED`] and [`MIN_EPOCH_DURATION`] this bounds
/// every `bias = slope * expiry` product below `u128::MAX`.
pub const MAX_TIMESTAMP: u64 = 1 << 40;

/// Shortest epoch a ledger may be configured with.
pub const MIN_EPOCH_DURATION: u64 = 3_600;

/// Domain separation tag for lock identifier derivation.
pub const LOCK_ID_DOMAIN: &[u8] = b"velock/lock-id/v1";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_total_locked_cannot_overflow_bias() {
        // Worst case: the whole cap in one lock under the shortest allowed max duration.
        let min_max_duration = (MIN_EPOCHS_TO_EXPIRY + 1) * MIN_EPOCH_DURATION;
        let max_slope = MAX_TOTAL_LOCKED / min_max_duration as u128;
        assert!(max_slope.checked_mul(MAX_TIMESTAMP as u128).is_some());
    }

    #[test]
    fn lock_window_fits_in_max_duration() {
        assert!(MAX_LOCK_EPOCHS > MIN_EPOCHS_TO_EXPIRY + 1);
    }
}
