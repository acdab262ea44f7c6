use quadvote_types::{Address, Credits};
use thiserror::Error;

/// Errors that can occur in ledger operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Unauthorized: {caller:?} is not the ledger owner")]
    Unauthorized { caller: Address },

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Credits, available: Credits },

    #[error("Balance overflow crediting {account:?}")]
    BalanceOverflow { account: Address },
}
