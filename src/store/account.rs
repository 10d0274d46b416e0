use crate::store::amount::{Amount, AmountError};
use crate::store::transaction::TransactionEntry;

/// A customer account: a balance plus the ordered, append-only log of every
/// movement that produced it. An empty history is a valid state.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    id: u32,
    balance: Amount,
    history: Vec<TransactionEntry>,
}

impl Account {
    pub fn new(id: u32, balance: Amount) -> Self {
        Account {
            id,
            balance,
            history: Vec::new(),
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn balance(&self) -> Amount {
        self.balance
    }

    /// Adds `delta` (which may be negative) to the balance. Does not check
    /// bounds; callers validate sufficiency before mutating.
    pub fn adjust_balance(&mut self, delta: Amount) -> Result<(), AmountError> {
        self.balance = self.balance.add(&delta)?;
        Ok(())
    }

    pub fn append_transaction(&mut self, entry: TransactionEntry) {
        self.history.push(entry);
    }

    /// The account's entries, oldest first.
    pub fn history(&self) -> &[TransactionEntry] {
        &self.history
    }

    /// Folds the history from zero. Matches `balance()` whenever the log is
    /// a faithful audit trail of the account.
    pub fn replayed_balance(&self) -> Result<Amount, AmountError> {
        let mut balance = Amount::ZERO;
        for entry in &self.history {
            balance = entry.apply_to(balance)?;
        }
        Ok(balance)
    }
}

#[cfg(test)]
mod tests {
    use super::Account;
    use crate::store::amount::Amount;
    use crate::store::transaction::{TransactionEntry, TransactionKind};

    fn entry(kind: TransactionKind, cents: i64, resulting: i64) -> TransactionEntry {
        TransactionEntry {
            account_id: 7,
            kind,
            amount: Amount::from_cents(cents),
            message: String::new(),
            resulting_balance: Amount::from_cents(resulting),
            timestamp: "Thu Jan  1 00:00:00 2026".to_string(),
        }
    }

    #[test]
    fn test_that_adjust_balance_applies_signed_deltas() {
        let mut account = Account::new(7, Amount::from_cents(10000));

        account.adjust_balance(Amount::from_cents(2500)).unwrap();
        assert_eq!(account.balance(), Amount::from_cents(12500));

        account.adjust_balance(Amount::from_cents(-500)).unwrap();
        assert_eq!(account.balance(), Amount::from_cents(12000));
    }

    #[test]
    fn test_that_history_preserves_append_order() {
        let mut account = Account::new(7, Amount::ZERO);
        assert!(account.history().is_empty());

        account.append_transaction(entry(TransactionKind::Deposit, 100, 100));
        account.append_transaction(entry(TransactionKind::Withdraw, 40, 60));

        let kinds: Vec<_> = account.history().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![TransactionKind::Deposit, TransactionKind::Withdraw]);
    }

    #[test]
    fn test_that_replayed_balance_reconstructs_the_balance_from_zero() {
        let mut account = Account::new(7, Amount::ZERO);
        account.adjust_balance(Amount::from_cents(100)).unwrap();
        account.append_transaction(entry(TransactionKind::Deposit, 100, 100));
        account.adjust_balance(Amount::from_cents(50)).unwrap();
        account.append_transaction(entry(TransactionKind::TransferIn, 50, 150));
        account.adjust_balance(Amount::from_cents(-30)).unwrap();
        account.append_transaction(entry(TransactionKind::TransferOut, 30, 120));

        assert_eq!(account.replayed_balance().unwrap(), account.balance());
        let last = account.history().last().unwrap();
        assert_eq!(last.resulting_balance, account.balance());
    }
}
