//! State snapshots: a ledger restored from bytes behaves exactly like the
//! ledger it was captured from.

use velock_core::error::SnapshotError;
use velock_core::memory::{MemoryCustody, MemoryDelegateRegistry};
use velock_ledger::{AggregateKey, LedgerConfig, LedgerState, VeLedger};
use velock_tests::helpers::*;

fn populated() -> TestLedger {
    let mut ledger = ledger(&[1, 2], &[9]);
    let a = ledger
        .create_lock(addr(1), 100_000, 20_000, T0 + 6 * EPOCH, None, T0 + 5)
        .unwrap();
    ledger
        .create_lock(addr(2), 300_000, 0, T0 + 9 * EPOCH, Some(addr(9)), T0 + 6)
        .unwrap();
    ledger.delegate_lock(addr(1), a, addr(9), T0 + EPOCH + 1).unwrap();
    ledger
}

#[test]
fn restored_ledger_continues_identically() {
    let mut original = populated();
    let bytes = original.state().to_bytes().unwrap();
    let state = LedgerState::from_bytes(&bytes).unwrap();
    let mut restored = VeLedger::from_state(
        small_config(),
        state,
        original.registry().clone(),
        original.custody().clone(),
    )
    .unwrap();
    assert_eq!(restored.state(), original.state());

    let later = T0 + 3 * EPOCH + 10;
    let id = original.locks_of(&addr(1))[0];
    for ledger in [&mut original, &mut restored] {
        ledger.undelegate_lock(addr(1), id, later).unwrap();
        ledger.increase_amount(addr(1), id, 50_000, 0, later + 1).unwrap();
        assert_conserved(ledger, later + 2 * EPOCH);
    }
    assert_eq!(restored.state(), original.state());
    for epoch in 1_000..1_012 {
        assert_eq!(
            restored.balance_at_epoch_end(&addr(9), epoch, true),
            original.balance_at_epoch_end(&addr(9), epoch, true)
        );
    }
}

#[test]
fn json_dump_roundtrips() {
    let ledger = populated();
    let json = serde_json::to_string_pretty(ledger.state()).unwrap();
    let back: LedgerState = serde_json::from_str(&json).unwrap();
    assert_eq!(&back, ledger.state());
}

#[test]
fn restore_rejects_different_epoch_length() {
    let ledger = populated();
    let config = LedgerConfig {
        epoch_duration: 2 * EPOCH,
        max_lock_duration: 2 * MAX_LOCK,
        ..small_config()
    };
    let err = VeLedger::from_state(
        config,
        ledger.state().clone(),
        MemoryDelegateRegistry::new(),
        MemoryCustody::new(),
    )
    .err();
    assert_eq!(
        err,
        Some(SnapshotError::EpochMismatch {
            snapshot: EPOCH,
            config: 2 * EPOCH
        })
    );
}

#[test]
fn restore_rejects_different_max_lock_duration() {
    let mut ledger = ledger(&[1], &[]);
    let id = ledger
        .create_lock(addr(1), 1_000_000, 0, T0 + 8 * EPOCH, None, T0)
        .unwrap();
    let config = LedgerConfig {
        max_lock_duration: 2 * MAX_LOCK,
        ..small_config()
    };
    let err = VeLedger::from_state(
        config,
        ledger.state().clone(),
        ledger.registry().clone(),
        ledger.custody().clone(),
    )
    .err();
    assert_eq!(
        err,
        Some(SnapshotError::MaxLockDurationMismatch {
            snapshot: MAX_LOCK,
            config: 2 * MAX_LOCK
        })
    );

    // The original keeps every lock curve consistent with its holder.
    ledger.increase_amount(addr(1), id, 1_000, 0, T0 + 1).unwrap();
    let decay = ledger.lock(&id).unwrap().decay;
    let user = ledger.aggregate(&AggregateKey::User(addr(1))).unwrap();
    assert_eq!(user.current(), decay);
    assert_conserved(&mut ledger, T0 + 2);
}

#[test]
fn restore_rejects_invalid_config() {
    let ledger = populated();
    let config = LedgerConfig {
        max_delegation_actions_per_epoch: 0,
        ..small_config()
    };
    let err = VeLedger::from_state(
        config,
        ledger.state().clone(),
        MemoryDelegateRegistry::new(),
        MemoryCustody::new(),
    )
    .err();
    assert!(matches!(err, Some(SnapshotError::Config(_))));
}
