mod account;
mod amount;
mod error;
mod ledger;
mod record;
mod storage;
mod transaction;
mod user;

pub use account::Account;
pub use amount::{Amount, AmountError};
pub use error::StoreError;
pub use ledger::{Ledger, MAXIMUM_DEPOSIT, MINIMUM_INITIAL_DEPOSIT, PASSWORD_ATTEMPT_LIMIT};
pub use record::{AccountRecord, TransactionRecord, UserRecord, decode_record, encode_record};
pub use storage::{DirStorage, MemoryStorage, Storage, Stream};
pub use transaction::{TransactionEntry, TransactionKind};
pub use user::{Profile, User};
