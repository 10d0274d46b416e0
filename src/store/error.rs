use std::io;
use thiserror::Error;

use crate::store::amount::{Amount, AmountError};

/// Everything a ledger operation can fail with. All variants are recoverable
/// at the caller's boundary; `MalformedRecord` and `StoreCorrupt` abort
/// `load()` because a store rebuilt from disagreeing streams cannot be
/// trusted.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("username already in use: {0}")]
    DuplicateUsername(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("initial deposit {given} is below the required minimum of {required}")]
    InsufficientInitialDeposit { given: Amount, required: Amount },

    #[error("invalid amount: {0}")]
    InvalidAmount(Amount),

    #[error("insufficient funds: requested {requested} with balance {available}")]
    InsufficientFunds {
        requested: Amount,
        available: Amount,
    },

    #[error("no such user: {0}")]
    UnknownRecipient(String),

    #[error("transfers to your own account are not allowed")]
    SelfTransferNotAllowed,

    #[error("malformed record {line:?}: {reason}")]
    MalformedRecord { line: String, reason: String },

    #[error("store corrupt: transaction references unknown account {0}")]
    StoreCorrupt(u32),

    #[error("stream {name} unavailable")]
    StreamUnavailable {
        name: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("balance arithmetic failed: {0}")]
    Arithmetic(#[from] AmountError),
}
