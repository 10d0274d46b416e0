use csv::Trim;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::store::account::Account;
use crate::store::amount::Amount;
use crate::store::error::StoreError;
use crate::store::transaction::{TransactionEntry, TransactionKind};
use crate::store::user::User;

/// Persisted line format: `first_name,last_name,email,user_name,password,account_id`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_name: String,
    pub password: String,
    pub account_id: u32,
}

/// Persisted line format: `account_id,balance`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AccountRecord {
    pub account_id: u32,
    pub balance: Amount,
}

/// Persisted line format: `account_id,kind,amount,message,resulting_balance,timestamp`
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TransactionRecord {
    pub account_id: u32,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub message: String,
    pub resulting_balance: Amount,
    pub timestamp: String,
}

impl UserRecord {
    pub const FIELDS: usize = 6;
}

impl AccountRecord {
    pub const FIELDS: usize = 2;
}

impl TransactionRecord {
    pub const FIELDS: usize = 6;
}

impl From<&User> for UserRecord {
    fn from(user: &User) -> Self {
        UserRecord {
            first_name: user.first_name().to_owned(),
            last_name: user.last_name().to_owned(),
            email: user.email().to_owned(),
            user_name: user.user_name().to_owned(),
            password: user.password().to_owned(),
            account_id: user.account_id(),
        }
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User::from_fields(
            record.first_name,
            record.last_name,
            record.email,
            record.user_name,
            record.password,
            record.account_id,
        )
    }
}

impl From<&Account> for AccountRecord {
    fn from(account: &Account) -> Self {
        AccountRecord {
            account_id: account.id(),
            balance: account.balance(),
        }
    }
}

impl From<AccountRecord> for Account {
    fn from(record: AccountRecord) -> Self {
        Account::new(record.account_id, record.balance)
    }
}

impl From<&TransactionEntry> for TransactionRecord {
    fn from(entry: &TransactionEntry) -> Self {
        TransactionRecord {
            account_id: entry.account_id,
            kind: entry.kind,
            amount: entry.amount,
            message: entry.message.clone(),
            resulting_balance: entry.resulting_balance,
            timestamp: entry.timestamp.clone(),
        }
    }
}

impl From<TransactionRecord> for TransactionEntry {
    fn from(record: TransactionRecord) -> Self {
        TransactionEntry {
            account_id: record.account_id,
            kind: record.kind,
            amount: record.amount,
            message: record.message,
            resulting_balance: record.resulting_balance,
            timestamp: record.timestamp,
        }
    }
}

fn malformed(line: &str, reason: impl Into<String>) -> StoreError {
    StoreError::MalformedRecord {
        line: line.to_owned(),
        reason: reason.into(),
    }
}

/// Decodes one comma-delimited line into a record, checking the field count
/// before handing the fields to serde. The only path by which persisted
/// state is rehydrated.
pub fn decode_record<T: DeserializeOwned>(
    line: &str,
    expected_fields: usize,
) -> Result<T, StoreError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    let record = match reader.records().next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => return Err(malformed(line, e.to_string())),
        None => return Err(malformed(line, "empty record")),
    };

    if record.len() != expected_fields {
        return Err(malformed(
            line,
            format!("expected {} fields, found {}", expected_fields, record.len()),
        ));
    }

    record
        .deserialize(None)
        .map_err(|e| malformed(line, e.to_string()))
}

/// Encodes one record as a single comma-delimited line. Fields containing
/// the delimiter are quoted by the csv layer, so a freeform message survives
/// a round trip.
pub fn encode_record<T: Serialize + fmt::Debug>(record: &T) -> Result<String, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer
        .serialize(record)
        .map_err(|e| malformed(&format!("{record:?}"), e.to_string()))?;
    let bytes = writer
        .into_inner()
        .map_err(|e| malformed(&format!("{record:?}"), e.to_string()))?;
    let mut line = String::from_utf8(bytes)
        .map_err(|e| malformed(&format!("{record:?}"), e.to_string()))?;

    while line.ends_with('\n') || line.ends_with('\r') {
        line.pop();
    }
    Ok(line)
}

#[cfg(test)]
mod tests {
    use super::{AccountRecord, TransactionRecord, UserRecord, decode_record, encode_record};
    use crate::store::amount::Amount;
    use crate::store::error::StoreError;
    use crate::store::transaction::TransactionKind;

    #[test]
    fn test_that_user_records_keep_the_persisted_field_order() {
        let record = UserRecord {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            user_name: "ada".into(),
            password: "Difference#1".into(),
            account_id: 3,
        };

        let line = encode_record(&record).unwrap();
        assert_eq!(line, "Ada,Lovelace,ada@example.com,ada,Difference#1,3");

        let decoded: UserRecord = decode_record(&line, UserRecord::FIELDS).unwrap();
        assert_eq!(decoded.user_name, "ada");
        assert_eq!(decoded.account_id, 3);
    }

    #[test]
    fn test_that_account_records_round_trip() {
        let line = encode_record(&AccountRecord {
            account_id: 12,
            balance: Amount::from_cents(123456),
        })
        .unwrap();
        assert_eq!(line, "12,1234.56");

        let decoded: AccountRecord = decode_record(&line, AccountRecord::FIELDS).unwrap();
        assert_eq!(decoded.account_id, 12);
        assert_eq!(decoded.balance, Amount::from_cents(123456));
    }

    #[test]
    fn test_that_transaction_kinds_use_their_wire_names() {
        let record = TransactionRecord {
            account_id: 4,
            kind: TransactionKind::TransferOut,
            amount: Amount::from_cents(15000),
            message: "to (bilbo)".into(),
            resulting_balance: Amount::from_cents(35000),
            timestamp: "Thu Aug  6 12:00:00 2026".into(),
        };

        let line = encode_record(&record).unwrap();
        assert_eq!(
            line,
            "4,Transfer-Out,150.00,to (bilbo),350.00,Thu Aug  6 12:00:00 2026"
        );

        let decoded: TransactionRecord = decode_record(&line, TransactionRecord::FIELDS).unwrap();
        assert_eq!(decoded.kind, TransactionKind::TransferOut);
    }

    #[test]
    fn test_that_messages_with_embedded_commas_survive_a_round_trip() {
        let record = TransactionRecord {
            account_id: 4,
            kind: TransactionKind::Deposit,
            amount: Amount::from_cents(100),
            message: "rent, split with flatmate".into(),
            resulting_balance: Amount::from_cents(100),
            timestamp: "t".into(),
        };

        let line = encode_record(&record).unwrap();
        let decoded: TransactionRecord = decode_record(&line, TransactionRecord::FIELDS).unwrap();
        assert_eq!(decoded.message, "rent, split with flatmate");
    }

    #[test]
    fn test_that_wrong_field_count_is_a_malformed_record() {
        let result = decode_record::<AccountRecord>("12,100.00,extra", AccountRecord::FIELDS);
        assert!(matches!(result, Err(StoreError::MalformedRecord { .. })));

        let result = decode_record::<UserRecord>("only,three,fields", UserRecord::FIELDS);
        assert!(matches!(result, Err(StoreError::MalformedRecord { .. })));
    }

    #[test]
    fn test_that_unparsable_fields_are_malformed_records() {
        // account id is not numeric
        let result = decode_record::<AccountRecord>("twelve,100.00", AccountRecord::FIELDS);
        assert!(matches!(result, Err(StoreError::MalformedRecord { .. })));

        // balance is not an amount
        let result = decode_record::<AccountRecord>("12,lots", AccountRecord::FIELDS);
        assert!(matches!(result, Err(StoreError::MalformedRecord { .. })));

        // unknown transaction kind
        let result = decode_record::<TransactionRecord>(
            "4,Refund,1.00,,1.00,now",
            TransactionRecord::FIELDS,
        );
        assert!(matches!(result, Err(StoreError::MalformedRecord { .. })));
    }
}
