//! Accounting module (chart of accounts).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns.

pub mod ledger;

pub use ledger::{BalanceSide, LedgerAccount, LedgerPatch, LedgerType, NewLedgerAccount};
