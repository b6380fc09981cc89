//! Shared fixtures and invariant checks for integration tests.

use velock_core::constants::TOKEN;
use velock_core::memory::{MemoryCustody, MemoryDelegateRegistry};
use velock_core::{Address, DecayFunction, Timestamp};
use velock_ledger::{LedgerConfig, VeLedger};

pub type TestLedger = VeLedger<MemoryDelegateRegistry, MemoryCustody>;

/// One-hour epochs.
pub const EPOCH: u64 = 3_600;
/// Ten-epoch maximum lock.
pub const MAX_LOCK: u64 = 10 * EPOCH;
/// Aligned start time used by most tests.
pub const T0: Timestamp = 1_000 * EPOCH;
/// Free balance given to each funded account.
pub const FUNDING: u128 = 1_000_000 * TOKEN;

/// Address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

pub fn small_config() -> LedgerConfig {
    LedgerConfig {
        epoch_duration: EPOCH,
        max_lock_duration: MAX_LOCK,
        max_delegation_actions_per_epoch: 2,
    }
}

/// Ledger at `T0` with `delegates` registered and `owners` funded in both assets.
pub fn ledger(owners: &[u8], delegates: &[u8]) -> TestLedger {
    ledger_with(small_config(), T0, owners, delegates)
}

pub fn ledger_with(
    config: LedgerConfig,
    now: Timestamp,
    owners: &[u8],
    delegates: &[u8],
) -> TestLedger {
    let mut registry = MemoryDelegateRegistry::new();
    for d in delegates {
        registry.register(addr(*d));
    }
    let mut custody = MemoryCustody::new();
    for o in owners {
        custody.fund(addr(*o), FUNDING, FUNDING);
    }
    VeLedger::new(config, registry, custody, now).unwrap()
}

/// Settle everything at `now` and check that the aggregates partition the
/// global aggregate exactly.
///
/// - global == sum of personal + sum of delegate aggregates
/// - every delegate aggregate == sum of its pair aggregates
/// - total locked == principal of live locks == principal held in custody
pub fn assert_conserved(ledger: &mut TestLedger, now: Timestamp) {
    ledger.settle_all(now).unwrap();
    let state = ledger.state();

    let mut parts = DecayFunction::ZERO;
    for (_, agg) in state.users() {
        assert_eq!(agg.last_updated(), state.global().last_updated());
        parts += agg.current();
    }
    for (delegate, agg) in state.delegates() {
        assert_eq!(agg.last_updated(), state.global().last_updated());
        parts += agg.current();

        let mut pairs = DecayFunction::ZERO;
        for (_, pair) in state.pairs_of(delegate) {
            pairs += pair.current();
        }
        assert_eq!(pairs, agg.current(), "pairs of {delegate} do not sum to it");
    }
    assert_eq!(parts, state.global().current(), "aggregates do not sum to global");

    let live: u128 = state
        .locks()
        .iter()
        .filter(|lock| !lock.unlocked)
        .map(|lock| lock.principal())
        .sum();
    assert_eq!(live, state.total_locked());
    let held = ledger.custody().held();
    assert_eq!(held.primary + held.escrowed, live);
}
