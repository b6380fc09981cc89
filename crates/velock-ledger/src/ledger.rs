//! The voting-escrow ledger.
//!
//! [`VeLedger`] ties the lock registry, the aggregates and the checkpoint
//! engine together behind the lock lifecycle operations. Every operation
//! follows the same order:
//!
//! 1. validate inputs and the caller (no state touched),
//! 2. move principal through [`Custody`] (may fail, still nothing touched),
//! 3. settle every aggregate the operation is about to change,
//! 4. apply the operation's own deltas, which cannot fail.
//!
//! A failed call therefore leaves the ledger exactly as it was.
//!
//! Delegation operations live in [`delegation`](crate::delegation) and the
//! read side in [`query`](crate::query).

use tracing::{debug, info};
use velock_core::constants::{MAX_TIMESTAMP, MAX_TOTAL_LOCKED, MIN_EPOCHS_TO_EXPIRY};
use velock_core::error::{ConfigError, LedgerError, SnapshotError};
use velock_core::traits::{Custody, DelegateRegistry};
use velock_core::{Address, Amount, DecayFunction, EpochClock, LockId, Timestamp};

use crate::aggregate::Aggregate;
use crate::checkpoint::{CheckpointEngine, SettleOutcome};
use crate::config::LedgerConfig;
use crate::lock::{AggregateKey, Holder};
use crate::state::LedgerState;

/// Voting-escrow ledger over a delegate registry `R` and a custody `C`.
pub struct VeLedger<R, C> {
    pub(crate) config: LedgerConfig,
    pub(crate) engine: CheckpointEngine,
    pub(crate) state: LedgerState,
    registry: R,
    custody: C,
}

impl<R: DelegateRegistry, C: Custody> VeLedger<R, C> {
    /// Create an empty ledger whose aggregates start in the epoch of `now`.
    pub fn new(
        config: LedgerConfig,
        registry: R,
        custody: C,
        now: Timestamp,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let clock = config.clock();
        let state = LedgerState::new(
            config.epoch_duration,
            config.max_lock_duration,
            clock.epoch_start(now),
        );
        info!(
            epoch_duration = config.epoch_duration,
            max_lock_duration = config.max_lock_duration,
            "ledger: initialized"
        );
        Ok(Self {
            config,
            engine: CheckpointEngine::new(clock),
            state,
            registry,
            custody,
        })
    }

    /// Restore a ledger from a previously captured [`LedgerState`].
    pub fn from_state(
        config: LedgerConfig,
        state: LedgerState,
        registry: R,
        custody: C,
    ) -> Result<Self, SnapshotError> {
        config.validate()?;
        if state.epoch_duration != config.epoch_duration {
            return Err(SnapshotError::EpochMismatch {
                snapshot: state.epoch_duration,
                config: config.epoch_duration,
            });
        }
        if state.max_lock_duration != config.max_lock_duration {
            return Err(SnapshotError::MaxLockDurationMismatch {
                snapshot: state.max_lock_duration,
                config: config.max_lock_duration,
            });
        }
        Ok(Self {
            config,
            engine: CheckpointEngine::new(config.clock()),
            state,
            registry,
            custody,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn clock(&self) -> &EpochClock {
        self.engine.clock()
    }

    pub fn state(&self) -> &LedgerState {
        &self.state
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut R {
        &mut self.registry
    }

    pub fn custody(&self) -> &C {
        &self.custody
    }

    pub fn custody_mut(&mut self) -> &mut C {
        &mut self.custody
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Lock `primary + escrowed` of `owner` until `expiry`.
    ///
    /// With a `delegate`, the owner holds the lock for the rest of the
    /// current epoch and the delegate from the next boundary on.
    pub fn create_lock(
        &mut self,
        owner: Address,
        primary: Amount,
        escrowed: Amount,
        expiry: Timestamp,
        delegate: Option<Address>,
        now: Timestamp,
    ) -> Result<LockId, LedgerError> {
        self.check_time(now)?;
        if primary == 0 && escrowed == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        let principal = primary
            .checked_add(escrowed)
            .ok_or(LedgerError::SupplyCapExceeded {
                requested: Amount::MAX,
                cap: MAX_TOTAL_LOCKED,
            })?;
        let min = Amount::from(self.config.max_lock_duration);
        if principal < min {
            return Err(LedgerError::AmountTooSmall { got: principal, min });
        }
        self.check_supply(principal)?;
        self.check_expiry_window(expiry, now)?;
        if let Some(d) = delegate {
            self.check_delegate_target(&owner, &d)?;
        }

        self.custody.transfer_in(&owner, primary, escrowed)?;

        self.touch(now);
        self.settle_global(now);
        let personal = Holder::Personal;
        self.settle_holder(personal, owner, now);

        let decay = DecayFunction::for_lock(principal, expiry, self.config.max_lock_duration);
        self.state.global.add(decay);
        self.state.global.schedule_expiry(expiry, decay.slope);
        for key in personal.aggregate_keys(owner) {
            let agg = self.aggregate_mut(key, now);
            agg.add(decay);
            agg.schedule_expiry(expiry, decay.slope);
        }

        let id = self
            .state
            .locks
            .create(owner, primary, escrowed, expiry, decay, now);
        self.state.total_locked = self.state.total_locked.saturating_add(principal);
        self.state.locks.checkpoint(&id, now)?;

        info!(
            lock = %id,
            owner = %owner,
            principal = %principal,
            expiry,
            "ledger: lock created"
        );

        if let Some(d) = delegate {
            self.apply_transition(id, Holder::Delegated(d), now)?;
        }
        Ok(id)
    }

    /// Add principal to a live lock, keeping its expiry.
    pub fn increase_amount(
        &mut self,
        caller: Address,
        id: LockId,
        add_primary: Amount,
        add_escrowed: Amount,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.check_time(now)?;
        let lock = self.state.locks.owned_live(&id, &caller)?;
        if add_primary == 0 && add_escrowed == 0 {
            return Err(LedgerError::ZeroAmount);
        }
        self.check_remaining(lock.expiry, now)?;
        let added = add_primary.saturating_add(add_escrowed);
        self.check_supply(added)?;

        let owner = lock.owner;
        let expiry = lock.expiry;
        let old = lock.decay;
        let primary = lock.primary.saturating_add(add_primary);
        let escrowed = lock.escrowed.saturating_add(add_escrowed);
        let current = lock.holder_at(now);
        let future = lock.holder;
        let handover_at = lock.delegation_epoch;

        self.custody.transfer_in(&owner, add_primary, add_escrowed)?;

        self.touch(now);
        self.settle_global(now);
        self.settle_holder(current, owner, now);
        self.settle_holder(future, owner, now);

        let decay = DecayFunction::for_lock(
            primary.saturating_add(escrowed),
            expiry,
            self.config.max_lock_duration,
        );
        let delta = decay.subtract(old);

        self.state.global.add(delta);
        self.state.global.schedule_expiry(expiry, delta.slope);
        self.credit(current, owner, delta, now);
        for key in future.aggregate_keys(owner) {
            self.aggregate_mut(key, now)
                .schedule_expiry(expiry, delta.slope);
        }
        if current != future {
            self.queue_handover(owner, current, future, handover_at, delta, now);
        }

        let lock = self.state.locks.get_mut(&id)?;
        lock.primary = primary;
        lock.escrowed = escrowed;
        lock.decay = decay;
        self.state.total_locked = self.state.total_locked.saturating_add(added);
        self.state.locks.checkpoint(&id, now)?;

        info!(
            lock = %id,
            added = %added,
            holder = %current,
            pending_holder = %future,
            "ledger: lock amount increased"
        );
        Ok(())
    }

    /// Push a live lock's expiry out to `new_expiry`.
    pub fn increase_duration(
        &mut self,
        caller: Address,
        id: LockId,
        new_expiry: Timestamp,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        self.check_time(now)?;
        let lock = self.state.locks.owned_live(&id, &caller)?;
        self.check_remaining(lock.expiry, now)?;
        if new_expiry <= lock.expiry {
            return Err(LedgerError::InvalidExpiry { expiry: new_expiry });
        }
        self.check_expiry_window(new_expiry, now)?;

        let owner = lock.owner;
        let old_expiry = lock.expiry;
        let old = lock.decay;
        let principal = lock.principal();
        let current = lock.holder_at(now);
        let future = lock.holder;
        let handover_at = lock.delegation_epoch;

        self.touch(now);
        self.settle_global(now);
        self.settle_holder(current, owner, now);
        self.settle_holder(future, owner, now);

        let decay = DecayFunction::for_lock(principal, new_expiry, self.config.max_lock_duration);
        let delta = decay.subtract(old);
        let slope = old.slope;

        self.state.global.add(delta);
        self.state
            .global
            .reschedule_expiry(old_expiry, new_expiry, slope);
        self.credit(current, owner, delta, now);
        for key in future.aggregate_keys(owner) {
            self.aggregate_mut(key, now)
                .reschedule_expiry(old_expiry, new_expiry, slope);
        }
        if current != future {
            self.queue_handover(owner, current, future, handover_at, delta, now);
        }

        let lock = self.state.locks.get_mut(&id)?;
        lock.expiry = new_expiry;
        lock.decay = decay;
        self.state.locks.checkpoint(&id, now)?;

        info!(
            lock = %id,
            old_expiry,
            new_expiry,
            "ledger: lock duration increased"
        );
        Ok(())
    }

    /// Release an expired lock's principal back to its owner.
    ///
    /// Returns the released `(primary, escrowed)` amounts.
    pub fn unlock(
        &mut self,
        caller: Address,
        id: LockId,
        now: Timestamp,
    ) -> Result<(Amount, Amount), LedgerError> {
        self.check_time(now)?;
        let lock = self.state.locks.owned_live(&id, &caller)?;
        if !lock.is_expired(now) {
            return Err(LedgerError::NotExpired {
                expiry: lock.expiry,
                now,
            });
        }
        let owner = lock.owner;
        let primary = lock.primary;
        let escrowed = lock.escrowed;
        let principal = lock.principal();
        let holder = lock.holder_at(now);

        self.custody.transfer_out(&owner, primary, escrowed)?;

        self.touch(now);
        self.settle_global(now);
        self.settle_holder(holder, owner, now);

        self.state.locks.get_mut(&id)?.unlocked = true;
        self.state.total_locked = self.state.total_locked.saturating_sub(principal);
        self.state.locks.checkpoint(&id, now)?;

        info!(
            lock = %id,
            owner = %owner,
            primary = %primary,
            escrowed = %escrowed,
            "ledger: lock released"
        );
        Ok((primary, escrowed))
    }

    // ------------------------------------------------------------------
    // Permissionless settlement
    // ------------------------------------------------------------------

    /// Settle the global aggregate, finalizing every crossed boundary.
    pub fn update_global(&mut self, now: Timestamp) -> Result<SettleOutcome, LedgerError> {
        self.check_time(now)?;
        self.touch(now);
        Ok(self.settle_global(now))
    }

    /// Settle the personal and delegate aggregates of `accounts`.
    pub fn update_accounts(
        &mut self,
        now: Timestamp,
        accounts: &[Address],
    ) -> Result<(), LedgerError> {
        self.check_time(now)?;
        self.touch(now);
        self.settle_global(now);
        for account in accounts {
            self.settle_existing(AggregateKey::User(*account), now);
            self.settle_existing(AggregateKey::Delegate(*account), now);
        }
        Ok(())
    }

    /// Settle the `(delegator, delegate)` pair aggregates.
    pub fn update_delegate_pairs(
        &mut self,
        now: Timestamp,
        pairs: &[(Address, Address)],
    ) -> Result<(), LedgerError> {
        self.check_time(now)?;
        self.touch(now);
        self.settle_global(now);
        for (delegator, delegate) in pairs {
            self.settle_existing(
                AggregateKey::Pair {
                    delegator: *delegator,
                    delegate: *delegate,
                },
                now,
            );
        }
        Ok(())
    }

    /// Settle every aggregate the ledger knows about.
    pub fn settle_all(&mut self, now: Timestamp) -> Result<(), LedgerError> {
        self.check_time(now)?;
        self.touch(now);
        self.settle_global(now);
        let engine = self.engine;
        let state = &mut self.state;
        for agg in state
            .users
            .values_mut()
            .chain(state.delegates.values_mut())
            .chain(state.pairs.values_mut().flat_map(|m| m.values_mut()))
        {
            engine.settle(agg, now);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Validation helpers
    // ------------------------------------------------------------------

    pub(crate) fn check_time(&self, now: Timestamp) -> Result<(), LedgerError> {
        if now > MAX_TIMESTAMP {
            return Err(LedgerError::TimestampOutOfRange(now));
        }
        if now < self.state.last_seen {
            return Err(LedgerError::ClockRegression {
                now,
                last_seen: self.state.last_seen,
            });
        }
        Ok(())
    }

    /// A new expiry must be aligned, within the maximum duration and past
    /// the end of the next epoch.
    fn check_expiry_window(&self, expiry: Timestamp, now: Timestamp) -> Result<(), LedgerError> {
        let clock = self.engine.clock();
        let latest = now.saturating_add(self.config.max_lock_duration);
        let min_exclusive = clock.min_expiry_exclusive(now, MIN_EPOCHS_TO_EXPIRY);
        if !clock.is_aligned(expiry)
            || expiry > MAX_TIMESTAMP
            || expiry > latest
            || expiry <= min_exclusive
        {
            return Err(LedgerError::InvalidExpiry { expiry });
        }
        Ok(())
    }

    /// An existing lock may only be changed while it outlives the next epoch.
    pub(crate) fn check_remaining(
        &self,
        expiry: Timestamp,
        now: Timestamp,
    ) -> Result<(), LedgerError> {
        let min_exclusive = self
            .engine
            .clock()
            .min_expiry_exclusive(now, MIN_EPOCHS_TO_EXPIRY);
        if expiry <= min_exclusive {
            return Err(LedgerError::LockExpiringTooSoon {
                expiry,
                min_exclusive,
            });
        }
        Ok(())
    }

    fn check_supply(&self, added: Amount) -> Result<(), LedgerError> {
        let requested = self.state.total_locked.saturating_add(added);
        if requested > MAX_TOTAL_LOCKED {
            return Err(LedgerError::SupplyCapExceeded {
                requested,
                cap: MAX_TOTAL_LOCKED,
            });
        }
        Ok(())
    }

    pub(crate) fn check_delegate_target(
        &self,
        owner: &Address,
        delegate: &Address,
    ) -> Result<(), LedgerError> {
        if owner == delegate {
            return Err(LedgerError::SelfDelegation);
        }
        if !self.registry.is_registered_delegate(delegate) {
            return Err(LedgerError::DelegateNotRegistered(*delegate));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Settlement and mutation helpers
    // ------------------------------------------------------------------

    pub(crate) fn touch(&mut self, now: Timestamp) {
        self.state.last_seen = self.state.last_seen.max(now);
    }

    pub(crate) fn settle_global(&mut self, now: Timestamp) -> SettleOutcome {
        let LedgerState {
            global,
            total_supply_at,
            ..
        } = &mut self.state;
        self.engine.settle_with(global, now, |boundary, state| {
            let supply = state.evaluate(boundary);
            total_supply_at.entry(boundary).or_insert(supply);
            debug!(boundary, supply = %supply, "checkpoint: epoch total supply finalized");
        })
    }

    /// Settled aggregate at `key`, created on first use.
    pub(crate) fn aggregate_mut(
        &mut self,
        key: AggregateKey,
        now: Timestamp,
    ) -> &mut Aggregate {
        let engine = self.engine;
        let agg = self
            .state
            .aggregate_entry(key, engine.clock().epoch_start(now));
        engine.settle(agg, now);
        agg
    }

    fn settle_existing(&mut self, key: AggregateKey, now: Timestamp) {
        if self.state.aggregate(&key).is_some() {
            self.aggregate_mut(key, now);
        }
    }

    pub(crate) fn settle_holder(&mut self, holder: Holder, owner: Address, now: Timestamp) {
        for key in holder.aggregate_keys(owner) {
            self.aggregate_mut(key, now);
        }
    }

    /// Add `delta` to `holder`'s aggregates now.
    fn credit(&mut self, holder: Holder, owner: Address, delta: DecayFunction, now: Timestamp) {
        for key in holder.aggregate_keys(owner) {
            self.aggregate_mut(key, now).add(delta);
        }
    }

    /// Book `curve` to move from `from` to `to` at `boundary`.
    pub(crate) fn queue_handover(
        &mut self,
        owner: Address,
        from: Holder,
        to: Holder,
        boundary: Timestamp,
        curve: DecayFunction,
        now: Timestamp,
    ) {
        for key in from.aggregate_keys(owner) {
            self.aggregate_mut(key, now)
                .queue_subtraction(boundary, curve);
        }
        for key in to.aggregate_keys(owner) {
            self.aggregate_mut(key, now).queue_addition(boundary, curve);
        }
    }
}
