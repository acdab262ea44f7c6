use quadvote_ledger::LedgerError;
use quadvote_types::{Address, Credits};
use thiserror::Error;

/// Errors that can occur in governance operations.
///
/// Every variant is terminal for the call that produced it: the engine
/// validates before it mutates, so no error leaves partial state behind.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GovernanceError {
    #[error("Unauthorized: {0:?} is not the owner")]
    Unauthorized(Address),

    #[error("Invalid duration: {0} minutes")]
    InvalidDuration(u64),

    #[error("Proposal not found: {0}")]
    NotFound(u64),

    #[error("Proposal closed: {0}")]
    ProposalClosed(u64),

    #[error("Already voted")]
    AlreadyVoted,

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Credits, available: Credits },

    #[error("Invalid credits: a vote must commit at least one credit")]
    InvalidCredits,

    #[error("Arithmetic overflow: {0}")]
    Overflow(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl From<LedgerError> for GovernanceError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Unauthorized { caller } => GovernanceError::Unauthorized(caller),
            LedgerError::InsufficientBalance { required, available } => {
                GovernanceError::InsufficientBalance { required, available }
            }
            LedgerError::BalanceOverflow { account } => {
                GovernanceError::Overflow(format!("balance of {}", account))
            }
        }
    }
}
