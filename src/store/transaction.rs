use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::amount::{Amount, AmountError};

/// The kind of balance movement a log entry records. The two transfer kinds
/// always come in pairs, one on each side of the transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    #[serde(rename = "Transfer-Out")]
    TransferOut,
    #[serde(rename = "Transfer-In")]
    TransferIn,
}

impl TransactionKind {
    /// Whether this kind credits the owning account when replayed.
    pub fn is_credit(&self) -> bool {
        matches!(self, TransactionKind::Deposit | TransactionKind::TransferIn)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionKind::Deposit => "Deposit",
            TransactionKind::Withdraw => "Withdraw",
            TransactionKind::TransferOut => "Transfer-Out",
            TransactionKind::TransferIn => "Transfer-In",
        };
        write!(f, "{}", name)
    }
}

/// One immutable record of a balance-affecting event on a single account.
/// Entries are only ever appended to an account's history, never edited or
/// removed, so in file order they replay to the account's balance.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionEntry {
    pub account_id: u32,
    pub kind: TransactionKind,
    /// Magnitude of the movement; the direction comes from `kind`.
    pub amount: Amount,
    pub message: String,
    /// Account balance immediately after this entry was appended.
    pub resulting_balance: Amount,
    pub timestamp: String,
}

impl TransactionEntry {
    /// Applies this entry's signed amount on top of `balance`.
    pub fn apply_to(&self, balance: Amount) -> Result<Amount, AmountError> {
        if self.kind.is_credit() {
            balance.add(&self.amount)
        } else {
            balance.sub(&self.amount)
        }
    }
}
