//! Collaborator interfaces consumed by the ledger.
//!
//! - [`DelegateRegistry`]: which addresses may receive delegated voting power
//! - [`Custody`]: principal movement on lock creation, increase and unlock
//!
//! The ledger treats both as black boxes. A failing [`Custody`] call aborts
//! the whole operation before any ledger state changes.

use crate::error::CustodyError;
use crate::types::{Address, Amount};

/// Read-only view of the delegate registration list.
pub trait DelegateRegistry: Send + Sync {
    /// Whether `address` is registered to receive delegated locks.
    fn is_registered_delegate(&self, address: &Address) -> bool;
}

/// Principal custody for the two lock sub-amounts.
pub trait Custody: Send + Sync {
    /// Move principal from `from` into escrow.
    fn transfer_in(
        &mut self,
        from: &Address,
        primary: Amount,
        escrowed: Amount,
    ) -> Result<(), CustodyError>;

    /// Release principal from escrow back to `to`.
    fn transfer_out(
        &mut self,
        to: &Address,
        primary: Amount,
        escrowed: Amount,
    ) -> Result<(), CustodyError>;
}

impl<T: DelegateRegistry + ?Sized> DelegateRegistry for &T {
    fn is_registered_delegate(&self, address: &Address) -> bool {
        (**self).is_registered_delegate(address)
    }
}
