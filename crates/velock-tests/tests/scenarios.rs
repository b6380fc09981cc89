//! End-to-end scenarios against the production parameters and the
//! ledger-level properties: decay correctness, snapshot immutability, the
//! expiry rule on every mutating operation, delegation lag and idempotent
//! settlement.

use velock_core::constants::{EPOCH_DURATION, MAX_LOCK_DURATION, SECONDS_PER_DAY, TOKEN};
use velock_core::error::LedgerError;
use velock_core::DecayFunction;
use velock_ledger::{AggregateKey, DelegationPhase, LedgerConfig};
use velock_tests::helpers::*;

const E: u64 = EPOCH_DURATION;
/// Aligned start under production epochs.
const START: u64 = 2_000 * E;

fn production(owners: &[u8], delegates: &[u8]) -> TestLedger {
    ledger_with(LedgerConfig::default(), START, owners, delegates)
}

// --- decay ---

#[test]
fn ten_epoch_lock_starts_at_full_ten_epoch_value() {
    let mut ledger = production(&[1], &[]);
    let principal = 1_000 * TOKEN;
    let expiry = START + 10 * E;
    let id = ledger
        .create_lock(addr(1), principal, 0, expiry, None, START)
        .unwrap();

    let decay = ledger.lock(&id).unwrap().decay;
    let slope = principal / u128::from(MAX_LOCK_DURATION);
    assert_eq!(decay.slope, slope);
    assert_eq!(decay.bias, slope * u128::from(expiry));
    assert_eq!(decay.evaluate(expiry), 0);
    assert_eq!(decay.evaluate(START), slope * u128::from(10 * E));
    assert_eq!(ledger.balance_of_at(&addr(1), false, START), slope * u128::from(10 * E));

    // Strictly decreasing up to expiry.
    let mut last = decay.evaluate(START);
    for step in 1..=10 {
        let t = START + step * E;
        let v = decay.evaluate(t);
        assert!(v < last, "not decreasing at {t}");
        last = v;
    }
    assert_eq!(last, 0);
}

#[test]
fn creation_time_is_not_part_of_the_curve() {
    let mut ledger = production(&[1, 2], &[]);
    let expiry = START + 12 * E;
    let a = ledger
        .create_lock(addr(1), 500 * TOKEN, 0, expiry, None, START + SECONDS_PER_DAY)
        .unwrap();
    let b = ledger
        .create_lock(addr(2), 500 * TOKEN, 0, expiry, None, START + 6 * SECONDS_PER_DAY)
        .unwrap();

    let da = ledger.lock(&a).unwrap().decay;
    let db = ledger.lock(&b).unwrap().decay;
    assert_eq!(da, db);
    for t in (START + 6 * SECONDS_PER_DAY..expiry).step_by(SECONDS_PER_DAY as usize * 7) {
        assert_eq!(
            ledger.balance_of_at(&addr(1), false, t),
            ledger.balance_of_at(&addr(2), false, t)
        );
    }
}

// --- snapshot immutability ---

#[test]
fn finalized_supply_never_changes() {
    let mut ledger = production(&[1, 2], &[9]);
    ledger
        .create_lock(addr(1), 1_000 * TOKEN, 0, START + 5 * E, None, START)
        .unwrap();
    ledger.update_global(START + E).unwrap();
    ledger.update_global(START + 2 * E).unwrap();
    let first = ledger.total_supply_at(START + E).unwrap();
    let second = ledger.total_supply_at(START + 2 * E).unwrap();

    // New locks, delegation and expiry after the fact.
    let id = ledger
        .create_lock(addr(2), 50_000 * TOKEN, 0, START + 20 * E, None, START + 2 * E + 1)
        .unwrap();
    ledger.delegate_lock(addr(2), id, addr(9), START + 3 * E).unwrap();
    ledger.update_global(START + 8 * E).unwrap();

    assert_eq!(ledger.total_supply_at(START + E), Some(first));
    assert_eq!(ledger.total_supply_at(START + 2 * E), Some(second));
    // Every boundary the global aggregate crossed is recorded.
    for k in 1..=8 {
        assert!(ledger.total_supply_at(START + k * E).is_some(), "boundary {k}");
    }
}

// --- expiry rule ---

#[test]
fn expiry_rule_applies_to_every_mutating_operation() {
    let mut ledger = production(&[1], &[8, 9]);
    let now = START + 3 * SECONDS_PER_DAY;
    let next_end = START + 2 * E;

    assert_eq!(
        ledger.create_lock(addr(1), 1_000 * TOKEN, 0, next_end, None, now),
        Err(LedgerError::InvalidExpiry { expiry: next_end })
    );

    let id = ledger
        .create_lock(addr(1), 1_000 * TOKEN, 0, START + 3 * E, None, now)
        .unwrap();
    ledger.delegate_lock(addr(1), id, addr(8), now).unwrap();

    // One epoch later the lock ends with the next epoch.
    let later = START + E + 1;
    let too_soon = Err(LedgerError::LockExpiringTooSoon {
        expiry: START + 3 * E,
        min_exclusive: START + 3 * E,
    });
    assert_eq!(ledger.increase_amount(addr(1), id, TOKEN, 0, later), too_soon);
    assert_eq!(
        ledger.increase_duration(addr(1), id, START + 6 * E, later),
        too_soon
    );
    assert_eq!(ledger.switch_delegate(addr(1), id, addr(9), later), too_soon);

    let other = ledger
        .create_lock(addr(1), 1_000 * TOKEN, 0, START + 4 * E, None, later)
        .unwrap();
    let much_later = START + 2 * E + 1;
    assert_eq!(
        ledger.delegate_lock(addr(1), other, addr(9), much_later),
        Err(LedgerError::LockExpiringTooSoon {
            expiry: START + 4 * E,
            min_exclusive: START + 4 * E,
        })
    );
}

// --- delegation lag ---

#[test]
fn delegated_power_moves_one_epoch_later() {
    let mut ledger = production(&[1], &[9]);
    let expiry = START + 8 * E;
    let id = ledger
        .create_lock(addr(1), 2_000 * TOKEN, 500 * TOKEN, expiry, None, START)
        .unwrap();
    let decay = ledger.lock(&id).unwrap().decay;

    let epoch = ledger.clock().epoch_number(START + E + 10);
    ledger.delegate_lock(addr(1), id, addr(9), START + E + 10).unwrap();
    let end = |e: u64| (e + 1) * E;

    assert_eq!(ledger.balance_at_epoch_end(&addr(9), epoch, true), 0);
    assert_eq!(
        ledger.balance_at_epoch_end(&addr(9), epoch + 1, true),
        decay.evaluate(end(epoch + 1))
    );
    assert_eq!(
        ledger.balance_at_epoch_end(&addr(1), epoch, false),
        decay.evaluate(end(epoch))
    );
    assert_eq!(ledger.balance_at_epoch_end(&addr(1), epoch + 1, false), 0);
    assert_eq!(
        ledger.specific_delegated_balance_at_epoch_end(&addr(1), &addr(9), epoch + 1),
        decay.evaluate(end(epoch + 1))
    );

    assert_eq!(
        ledger.delegation_phase(&id, START + E + 10),
        Ok(DelegationPhase::PendingDelegation)
    );
    assert_eq!(
        ledger.delegation_phase(&id, START + 2 * E),
        Ok(DelegationPhase::ActiveDelegation)
    );

    assert_conserved(&mut ledger, START + 2 * E);
    let pair = ledger
        .aggregate(&AggregateKey::Pair {
            delegator: addr(1),
            delegate: addr(9),
        })
        .unwrap();
    assert_eq!(pair.current(), decay);
}

#[test]
fn increases_in_every_phase_land_with_the_right_holder() {
    let mut ledger = production(&[1], &[8, 9]);
    let expiry = START + 12 * E;
    let id = ledger
        .create_lock(addr(1), 1_000 * TOKEN, 0, expiry, None, START)
        .unwrap();

    // Pending delegation.
    ledger.delegate_lock(addr(1), id, addr(8), START + 10).unwrap();
    ledger.increase_amount(addr(1), id, 1_000 * TOKEN, 0, START + 20).unwrap();
    // Active delegation.
    ledger.increase_amount(addr(1), id, 0, 1_000 * TOKEN, START + E).unwrap();
    // Pending switch.
    ledger.switch_delegate(addr(1), id, addr(9), START + 2 * E).unwrap();
    ledger.increase_duration(addr(1), id, START + 14 * E, START + 2 * E + 5).unwrap();
    // Pending undelegation.
    ledger.undelegate_lock(addr(1), id, START + 3 * E).unwrap();
    ledger.increase_amount(addr(1), id, 1_000 * TOKEN, 0, START + 3 * E + 5).unwrap();
    assert_eq!(
        ledger.delegation_phase(&id, START + 3 * E + 5),
        Ok(DelegationPhase::PendingUndelegation)
    );

    let decay = ledger.lock(&id).unwrap().decay;
    assert_eq!(decay, DecayFunction::for_lock(4_000 * TOKEN, START + 14 * E, MAX_LOCK_DURATION));

    let holders = |l: &TestLedger, epoch: u64| {
        (
            l.balance_at_epoch_end(&addr(1), epoch, false),
            l.balance_at_epoch_end(&addr(8), epoch, true),
            l.balance_at_epoch_end(&addr(9), epoch, true),
        )
    };
    let at = |epoch: u64, principal: u128, exp: u64| {
        DecayFunction::for_lock(principal, exp, MAX_LOCK_DURATION).evaluate((epoch + 1) * E)
    };
    let e0 = START / E;

    assert_eq!(holders(&ledger, e0), (at(e0, 2_000 * TOKEN, expiry), 0, 0));
    assert_eq!(holders(&ledger, e0 + 1), (0, at(e0 + 1, 3_000 * TOKEN, expiry), 0));
    assert_eq!(
        holders(&ledger, e0 + 2),
        (0, at(e0 + 2, 3_000 * TOKEN, START + 14 * E), 0)
    );
    assert_eq!(
        holders(&ledger, e0 + 3),
        (0, 0, at(e0 + 3, 4_000 * TOKEN, START + 14 * E))
    );
    assert_eq!(
        holders(&ledger, e0 + 4),
        (at(e0 + 4, 4_000 * TOKEN, START + 14 * E), 0, 0)
    );

    assert_conserved(&mut ledger, START + 5 * E);
}

// --- settlement ---

#[test]
fn settling_twice_changes_nothing() {
    let mut ledger = production(&[1], &[9]);
    ledger
        .create_lock(addr(1), 1_000 * TOKEN, 0, START + 6 * E, Some(addr(9)), START)
        .unwrap();
    let now = START + 4 * E + 17;
    ledger.settle_all(now).unwrap();
    let once = ledger.state().clone();
    ledger.settle_all(now).unwrap();
    ledger.update_accounts(now, &[addr(1), addr(9)]).unwrap();
    ledger.update_delegate_pairs(now, &[(addr(1), addr(9))]).unwrap();
    assert_eq!(ledger.state(), &once);
}

#[test]
fn full_lifecycle_returns_principal() {
    let mut ledger = production(&[1], &[9]);
    let expiry = START + 4 * E;
    let id = ledger
        .create_lock(addr(1), 700 * TOKEN, 300 * TOKEN, expiry, Some(addr(9)), START)
        .unwrap();
    assert_eq!(
        ledger.unlock(addr(1), id, expiry + 1),
        Ok((700 * TOKEN, 300 * TOKEN))
    );
    let balance = ledger.custody().balance_of(&addr(1));
    assert_eq!(balance.primary, FUNDING);
    assert_eq!(balance.escrowed, FUNDING);
    assert_eq!(ledger.total_locked(), 0);
    assert_conserved(&mut ledger, expiry + 1);
    assert!(ledger.global().current().is_zero());
    assert_eq!(ledger.lock_history(&id).len(), 3);
}
