//! Integration test suite for the velock ledger.
//!
//! Scenario and property tests that drive a full [`velock_ledger::VeLedger`]
//! over in-memory collaborators and check the cross-aggregate invariants.

pub mod helpers;
