//! In-memory collaborator implementations.
//!
//! [`MemoryDelegateRegistry`] and [`MemoryCustody`] back tests and the CLI.
//! Neither persists anything.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::CustodyError;
use crate::traits::{Custody, DelegateRegistry};
use crate::types::{Address, Amount};

/// Delegate registration list held in a `HashSet`.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MemoryDelegateRegistry {
    delegates: HashSet<Address>,
}

impl MemoryDelegateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address`. Returns `false` if it was already registered.
    pub fn register(&mut self, address: Address) -> bool {
        self.delegates.insert(address)
    }

    /// Unregister `address`. Returns `false` if it was not registered.
    ///
    /// Locks already delegated to it keep their delegation; only new
    /// delegations are refused.
    pub fn unregister(&mut self, address: &Address) -> bool {
        self.delegates.remove(address)
    }

    pub fn len(&self) -> usize {
        self.delegates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }
}

impl DelegateRegistry for MemoryDelegateRegistry {
    fn is_registered_delegate(&self, address: &Address) -> bool {
        self.delegates.contains(address)
    }
}

/// Free (not escrowed) balances of one account.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Balances {
    pub primary: Amount,
    pub escrowed: Amount,
}

/// Custody ledger tracking free balances per account and the escrowed total.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct MemoryCustody {
    balances: HashMap<Address, Balances>,
    held: Balances,
}

impl MemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit free balance to `account`.
    pub fn fund(&mut self, account: Address, primary: Amount, escrowed: Amount) {
        let entry = self.balances.entry(account).or_default();
        entry.primary = entry.primary.saturating_add(primary);
        entry.escrowed = entry.escrowed.saturating_add(escrowed);
    }

    /// Free balances of `account`.
    pub fn balance_of(&self, account: &Address) -> Balances {
        self.balances.get(account).copied().unwrap_or_default()
    }

    /// Total principal currently held in escrow.
    pub fn held(&self) -> Balances {
        self.held
    }
}

impl Custody for MemoryCustody {
    fn transfer_in(
        &mut self,
        from: &Address,
        primary: Amount,
        escrowed: Amount,
    ) -> Result<(), CustodyError> {
        let have = self.balance_of(from);
        if have.primary < primary {
            return Err(CustodyError::InsufficientBalance {
                account: *from,
                have: have.primary,
                need: primary,
            });
        }
        if have.escrowed < escrowed {
            return Err(CustodyError::InsufficientBalance {
                account: *from,
                have: have.escrowed,
                need: escrowed,
            });
        }
        let held_primary = self
            .held
            .primary
            .checked_add(primary)
            .ok_or(CustodyError::BalanceOverflow(*from))?;
        let held_escrowed = self
            .held
            .escrowed
            .checked_add(escrowed)
            .ok_or(CustodyError::BalanceOverflow(*from))?;

        self.balances.insert(
            *from,
            Balances {
                primary: have.primary - primary,
                escrowed: have.escrowed - escrowed,
            },
        );
        self.held = Balances {
            primary: held_primary,
            escrowed: held_escrowed,
        };
        Ok(())
    }

    fn transfer_out(
        &mut self,
        to: &Address,
        primary: Amount,
        escrowed: Amount,
    ) -> Result<(), CustodyError> {
        if self.held.primary < primary {
            return Err(CustodyError::InsufficientBalance {
                account: *to,
                have: self.held.primary,
                need: primary,
            });
        }
        if self.held.escrowed < escrowed {
            return Err(CustodyError::InsufficientBalance {
                account: *to,
                have: self.held.escrowed,
                need: escrowed,
            });
        }
        self.held.primary -= primary;
        self.held.escrowed -= escrowed;
        self.fund(*to, primary, escrowed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    // --- MemoryDelegateRegistry ---

    #[test]
    fn register_and_unregister() {
        let mut reg = MemoryDelegateRegistry::new();
        assert!(reg.is_empty());
        assert!(reg.register(addr(1)));
        assert!(!reg.register(addr(1)));
        assert!(reg.is_registered_delegate(&addr(1)));
        assert_eq!(reg.len(), 1);

        assert!(reg.unregister(&addr(1)));
        assert!(!reg.unregister(&addr(1)));
        assert!(!reg.is_registered_delegate(&addr(1)));
    }

    // --- MemoryCustody ---

    #[test]
    fn transfer_in_moves_balance_into_escrow() {
        let mut custody = MemoryCustody::new();
        custody.fund(addr(1), 100, 50);
        custody.transfer_in(&addr(1), 60, 20).unwrap();

        assert_eq!(custody.balance_of(&addr(1)), Balances { primary: 40, escrowed: 30 });
        assert_eq!(custody.held(), Balances { primary: 60, escrowed: 20 });
    }

    #[test]
    fn transfer_in_insufficient_leaves_state_untouched() {
        let mut custody = MemoryCustody::new();
        custody.fund(addr(1), 100, 0);
        let err = custody.transfer_in(&addr(1), 50, 1).unwrap_err();
        assert_eq!(
            err,
            CustodyError::InsufficientBalance { account: addr(1), have: 0, need: 1 }
        );
        assert_eq!(custody.balance_of(&addr(1)), Balances { primary: 100, escrowed: 0 });
        assert_eq!(custody.held(), Balances::default());
    }

    #[test]
    fn transfer_out_returns_principal() {
        let mut custody = MemoryCustody::new();
        custody.fund(addr(1), 100, 100);
        custody.transfer_in(&addr(1), 100, 100).unwrap();
        custody.transfer_out(&addr(1), 100, 100).unwrap();

        assert_eq!(custody.balance_of(&addr(1)), Balances { primary: 100, escrowed: 100 });
        assert_eq!(custody.held(), Balances::default());
    }

    #[test]
    fn transfer_out_more_than_held_fails() {
        let mut custody = MemoryCustody::new();
        assert!(custody.transfer_out(&addr(1), 1, 0).is_err());
    }

    #[test]
    fn unknown_account_has_zero_balance() {
        let custody = MemoryCustody::new();
        assert_eq!(custody.balance_of(&addr(7)), Balances::default());
    }
}
