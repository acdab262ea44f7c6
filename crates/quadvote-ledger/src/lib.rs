//! Quadvote Ledger - Authoritative store of per-account credit balances.
//!
//! Credits enter the ledger only through owner-gated minting and leave it only
//! through debits issued by the voting engine. There are no transfers.

pub mod error;
pub mod ledger;

pub use error::LedgerError;
pub use ledger::CreditLedger;
