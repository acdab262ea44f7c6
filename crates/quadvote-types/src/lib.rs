//! Quadvote Types - Core type definitions shared by the ledger and the voting engine.
//!
//! This crate provides:
//! - Addresses (20-byte, Bech32m encoded)
//! - Credit amounts and voting power (checked integer arithmetic)
//! - Timestamps (Unix seconds)

pub mod address;
pub mod amount;
pub mod time;
pub mod error;

#[cfg(feature = "serde")]
mod serialization;

pub use address::Address;
pub use amount::{Credits, VotingPower};
pub use time::Timestamp;
pub use error::TypesError;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{Address, Credits, Timestamp, TypesError, VotingPower};
}
