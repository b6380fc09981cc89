//! JSON scenarios replayed against an in-memory ledger.
//!
//! A scenario registers delegates, funds accounts and then runs a list of
//! timestamped steps. Locks are referenced by creation index. A failing
//! step is reported and the replay carries on; the ledger rejects it
//! without changing state.
//!
//! ```json
//! {
//!   "start": 2419200000,
//!   "delegates": ["0x0909090909090909090909090909090909090909"],
//!   "balances": [{ "account": "0x01...01", "primary": "5000000000000000000000" }],
//!   "steps": [
//!     { "at": 2419200000, "action": "create_lock", "owner": "0x01...01",
//!       "primary": "1000000000000000000000", "expiry": 2443392000 },
//!     { "at": 2419200100, "action": "delegate", "lock": 0,
//!       "delegate": "0x0909090909090909090909090909090909090909" },
//!     { "at": 2419200200, "action": "balance_at_epoch_end",
//!       "account": "0x09...09", "epoch": 1001, "include_delegated": true }
//!   ]
//! }
//! ```

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::{debug, warn};
use velock_core::memory::{MemoryCustody, MemoryDelegateRegistry};
use velock_core::{Address, Amount, LockId, Timestamp};
use velock_ledger::{LedgerConfig, VeLedger};

pub type ScenarioLedger = VeLedger<MemoryDelegateRegistry, MemoryCustody>;

#[derive(Deserialize, Debug, Clone)]
pub struct Scenario {
    /// Ledger creation time. Defaults to the first step's timestamp.
    #[serde(default)]
    pub start: Option<Timestamp>,
    #[serde(default)]
    pub delegates: Vec<Address>,
    #[serde(default)]
    pub balances: Vec<Funding>,
    pub steps: Vec<Step>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Funding {
    pub account: Address,
    #[serde(default, deserialize_with = "amount")]
    pub primary: Amount,
    #[serde(default, deserialize_with = "amount")]
    pub escrowed: Amount,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Step {
    pub at: Timestamp,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateLock {
        owner: Address,
        #[serde(default, deserialize_with = "amount")]
        primary: Amount,
        #[serde(default, deserialize_with = "amount")]
        escrowed: Amount,
        expiry: Timestamp,
        #[serde(default)]
        delegate: Option<Address>,
    },
    IncreaseAmount {
        lock: usize,
        #[serde(default, deserialize_with = "amount")]
        primary: Amount,
        #[serde(default, deserialize_with = "amount")]
        escrowed: Amount,
    },
    IncreaseDuration {
        lock: usize,
        expiry: Timestamp,
    },
    Delegate {
        lock: usize,
        delegate: Address,
    },
    SwitchDelegate {
        lock: usize,
        delegate: Address,
    },
    Undelegate {
        lock: usize,
    },
    Unlock {
        lock: usize,
    },
    Settle,
    BalanceAtEpochEnd {
        account: Address,
        epoch: u64,
        #[serde(default)]
        include_delegated: bool,
    },
    BalanceOfAt {
        account: Address,
        #[serde(default)]
        include_delegated: bool,
    },
    TotalSupplyAt {
        boundary: Timestamp,
    },
    DelegatedPairAtEpochEnd {
        delegator: Address,
        delegate: Address,
        epoch: u64,
    },
    LockPowerAt {
        lock: usize,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateLock { .. } => "create_lock",
            Self::IncreaseAmount { .. } => "increase_amount",
            Self::IncreaseDuration { .. } => "increase_duration",
            Self::Delegate { .. } => "delegate",
            Self::SwitchDelegate { .. } => "switch_delegate",
            Self::Undelegate { .. } => "undelegate",
            Self::Unlock { .. } => "unlock",
            Self::Settle => "settle",
            Self::BalanceAtEpochEnd { .. } => "balance_at_epoch_end",
            Self::BalanceOfAt { .. } => "balance_of_at",
            Self::TotalSupplyAt { .. } => "total_supply_at",
            Self::DelegatedPairAtEpochEnd { .. } => "delegated_pair_at_epoch_end",
            Self::LockPowerAt { .. } => "lock_power_at",
        }
    }
}

/// Outcome of one replayed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Mutation applied.
    Applied,
    /// Lock created with the given creation index.
    Created(usize),
    /// Query answered.
    Value(Option<Amount>),
    /// Step rejected.
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "ok"),
            Self::Created(index) => write!(f, "ok (lock #{index})"),
            Self::Value(Some(v)) => write!(f, "{v}"),
            Self::Value(None) => write!(f, "not finalized"),
            Self::Failed(reason) => write!(f, "error: {reason}"),
        }
    }
}

/// Replay result: the final ledger and one outcome per step.
pub struct Report {
    pub ledger: ScenarioLedger,
    pub outcomes: Vec<(Timestamp, &'static str, Outcome)>,
}

impl Report {
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, _, o)| matches!(o, Outcome::Failed(_)))
            .count()
    }
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse scenario {}", path.display()))
    }

    /// Run every step against a fresh ledger built from `config`.
    pub fn replay(&self, config: LedgerConfig) -> Result<Report> {
        let start = self
            .start
            .or_else(|| self.steps.first().map(|s| s.at))
            .unwrap_or_default();

        let mut registry = MemoryDelegateRegistry::new();
        for d in &self.delegates {
            registry.register(*d);
        }
        let mut custody = MemoryCustody::new();
        for funding in &self.balances {
            custody.fund(funding.account, funding.primary, funding.escrowed);
        }
        let mut ledger =
            VeLedger::new(config, registry, custody, start).context("invalid ledger configuration")?;

        let mut locks: Vec<LockId> = Vec::new();
        let mut outcomes = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let outcome = match apply(&mut ledger, &mut locks, step) {
                Ok(outcome) => outcome,
                Err(reason) => {
                    warn!(at = step.at, action = step.action.name(), %reason, "replay: step rejected");
                    Outcome::Failed(reason)
                }
            };
            debug!(at = step.at, action = step.action.name(), %outcome, "replay: step done");
            outcomes.push((step.at, step.action.name(), outcome));
        }
        Ok(Report { ledger, outcomes })
    }
}

fn lock_at(locks: &[LockId], index: usize) -> Result<LockId, String> {
    locks
        .get(index)
        .copied()
        .ok_or_else(|| format!("no lock #{index}"))
}

fn owner_of(ledger: &ScenarioLedger, id: &LockId) -> Result<Address, String> {
    ledger
        .lock(id)
        .map(|lock| lock.owner)
        .map_err(|e| e.to_string())
}

fn apply(ledger: &mut ScenarioLedger, locks: &mut Vec<LockId>, step: &Step) -> Result<Outcome, String> {
    let now = step.at;
    let applied = |r: Result<(), velock_core::error::LedgerError>| {
        r.map(|_| Outcome::Applied).map_err(|e| e.to_string())
    };

    match &step.action {
        Action::CreateLock {
            owner,
            primary,
            escrowed,
            expiry,
            delegate,
        } => {
            let id = ledger
                .create_lock(*owner, *primary, *escrowed, *expiry, *delegate, now)
                .map_err(|e| e.to_string())?;
            locks.push(id);
            Ok(Outcome::Created(locks.len() - 1))
        }
        Action::IncreaseAmount {
            lock,
            primary,
            escrowed,
        } => {
            let id = lock_at(locks, *lock)?;
            let owner = owner_of(ledger, &id)?;
            applied(ledger.increase_amount(owner, id, *primary, *escrowed, now))
        }
        Action::IncreaseDuration { lock, expiry } => {
            let id = lock_at(locks, *lock)?;
            let owner = owner_of(ledger, &id)?;
            applied(ledger.increase_duration(owner, id, *expiry, now))
        }
        Action::Delegate { lock, delegate } => {
            let id = lock_at(locks, *lock)?;
            let owner = owner_of(ledger, &id)?;
            applied(ledger.delegate_lock(owner, id, *delegate, now))
        }
        Action::SwitchDelegate { lock, delegate } => {
            let id = lock_at(locks, *lock)?;
            let owner = owner_of(ledger, &id)?;
            applied(ledger.switch_delegate(owner, id, *delegate, now))
        }
        Action::Undelegate { lock } => {
            let id = lock_at(locks, *lock)?;
            let owner = owner_of(ledger, &id)?;
            applied(ledger.undelegate_lock(owner, id, now))
        }
        Action::Unlock { lock } => {
            let id = lock_at(locks, *lock)?;
            let owner = owner_of(ledger, &id)?;
            ledger
                .unlock(owner, id, now)
                .map(|_| Outcome::Applied)
                .map_err(|e| e.to_string())
        }
        Action::Settle => applied(ledger.settle_all(now)),
        Action::BalanceAtEpochEnd {
            account,
            epoch,
            include_delegated,
        } => Ok(Outcome::Value(Some(ledger.balance_at_epoch_end(
            account,
            *epoch,
            *include_delegated,
        )))),
        Action::BalanceOfAt {
            account,
            include_delegated,
        } => Ok(Outcome::Value(Some(ledger.balance_of_at(
            account,
            *include_delegated,
            now,
        )))),
        Action::TotalSupplyAt { boundary } => Ok(Outcome::Value(ledger.total_supply_at(*boundary))),
        Action::DelegatedPairAtEpochEnd {
            delegator,
            delegate,
            epoch,
        } => Ok(Outcome::Value(Some(
            ledger.specific_delegated_balance_at_epoch_end(delegator, delegate, *epoch),
        ))),
        Action::LockPowerAt { lock } => {
            let id = lock_at(locks, *lock)?;
            ledger
                .lock_voting_power_at(&id, now)
                .map(|v| Outcome::Value(Some(v)))
                .map_err(|e| e.to_string())
        }
    }
}

/// Accept amounts as JSON numbers or decimal strings; values above
/// `u64::MAX` must be strings.
fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Amount, D::Error> {
    struct AmountVisitor;

    impl Visitor<'_> for AmountVisitor {
        type Value = Amount;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an unsigned integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
            Ok(Amount::from(v))
        }

        fn visit_u128<E: de::Error>(self, v: u128) -> Result<Amount, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
            v.trim()
                .replace('_', "")
                .parse()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    deserializer.deserialize_any(AmountVisitor)
}
