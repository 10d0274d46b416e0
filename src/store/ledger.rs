use std::collections::{BTreeMap, HashMap};

use crate::store::account::Account;
use crate::store::amount::Amount;
use crate::store::error::StoreError;
use crate::store::record::{
    AccountRecord, TransactionRecord, UserRecord, decode_record, encode_record,
};
use crate::store::storage::{Storage, Stream};
use crate::store::transaction::{TransactionEntry, TransactionKind};
use crate::store::user::{Profile, User};

/// Smallest opening deposit accepted at sign-up.
pub const MINIMUM_INITIAL_DEPOSIT: Amount = Amount::from_cents(100_00);

/// Largest single deposit accepted.
pub const MAXIMUM_DEPOSIT: Amount = Amount::from_cents(100_000_000);

/// Consecutive password mismatches tolerated before password changes lock.
pub const PASSWORD_ATTEMPT_LIMIT: u8 = 3;

/// The ledger store: every user and account indexed in memory, with the
/// storage backend as the persisted mirror. All mutating operations go
/// through here; each one rewrites the three streams in full, so persisted
/// state is never observed mid-mutation. There is no rollback if a rewrite
/// is interrupted partway.
///
/// Ordered maps keep the persisted record order stable across rewrites:
/// users by username, accounts by id.
pub struct Ledger<S: Storage> {
    users: BTreeMap<String, User>,
    accounts: BTreeMap<u32, Account>,
    last_account_id: u32,
    password_attempts: HashMap<String, u8>,
    storage: S,
}

impl<S: Storage> Ledger<S> {
    pub fn new(storage: S) -> Self {
        Ledger {
            users: BTreeMap::new(),
            accounts: BTreeMap::new(),
            last_account_id: 0,
            password_attempts: HashMap::new(),
            storage,
        }
    }

    /// Constructs a ledger and loads it from `storage` in one step.
    pub fn open(storage: S) -> Result<Self, StoreError> {
        let mut ledger = Ledger::new(storage);
        ledger.load()?;
        Ok(ledger)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Rebuilds the in-memory state from the persisted streams: users, then
    /// accounts, then the transaction history attached to its owning account
    /// in file order. Any undecodable line aborts with `MalformedRecord`; a
    /// history entry naming an account that does not exist aborts with
    /// `StoreCorrupt` (the streams disagree, so none of them can be
    /// trusted). An account whose history does not replay to its balance is
    /// kept as stored, with a warning.
    pub fn load(&mut self) -> Result<(), StoreError> {
        self.users.clear();
        self.accounts.clear();
        self.password_attempts.clear();
        self.last_account_id = 0;

        for line in self.storage.read_lines(Stream::Users)? {
            let record: UserRecord = decode_record(&line, UserRecord::FIELDS)?;
            let user = User::from(record);
            let user_name = user.user_name().to_owned();
            if self.users.insert(user_name.clone(), user).is_some() {
                log::warn!("duplicate user record for {user_name:?}; keeping the later one");
            }
        }

        for line in self.storage.read_lines(Stream::Accounts)? {
            let record: AccountRecord = decode_record(&line, AccountRecord::FIELDS)?;
            let account = Account::from(record);
            let id = account.id();
            self.last_account_id = self.last_account_id.max(id);
            if self.accounts.insert(id, account).is_some() {
                log::warn!("duplicate account record for id {id}; keeping the later one");
            }
        }

        for line in self.storage.read_lines(Stream::History)? {
            let record: TransactionRecord = decode_record(&line, TransactionRecord::FIELDS)?;
            let entry = TransactionEntry::from(record);
            match self.accounts.get_mut(&entry.account_id) {
                Some(account) => account.append_transaction(entry),
                None => return Err(StoreError::StoreCorrupt(entry.account_id)),
            }
        }

        for account in self.accounts.values() {
            if account.replayed_balance()? != account.balance() {
                log::warn!(
                    "account {} history does not replay to its balance {}",
                    account.id(),
                    account.balance()
                );
            }
        }

        log::debug!(
            "loaded {} users and {} accounts",
            self.users.len(),
            self.accounts.len()
        );
        Ok(())
    }

    /// Rewrites all three streams from the in-memory state: users in map
    /// order, accounts in id order, and the flattened history (account
    /// order, then append order within each account).
    pub fn persist(&self) -> Result<(), StoreError> {
        let mut user_lines = Vec::with_capacity(self.users.len());
        for user in self.users.values() {
            user_lines.push(encode_record(&UserRecord::from(user))?);
        }

        let mut account_lines = Vec::with_capacity(self.accounts.len());
        let mut history_lines = Vec::new();
        for account in self.accounts.values() {
            account_lines.push(encode_record(&AccountRecord::from(account))?);
            for entry in account.history() {
                history_lines.push(encode_record(&TransactionRecord::from(entry))?);
            }
        }

        self.storage.write_lines(Stream::Users, &user_lines)?;
        self.storage.write_lines(Stream::Accounts, &account_lines)?;
        self.storage.write_lines(Stream::History, &history_lines)?;
        Ok(())
    }

    /// Creates a user and their account with a freshly allocated id, logs
    /// the opening deposit, and persists. Returns the new account id.
    pub fn sign_up(
        &mut self,
        user_name: &str,
        profile: Profile,
        initial_deposit: Amount,
    ) -> Result<u32, StoreError> {
        if self.users.contains_key(user_name) {
            return Err(StoreError::DuplicateUsername(user_name.to_owned()));
        }
        if initial_deposit < MINIMUM_INITIAL_DEPOSIT {
            return Err(StoreError::InsufficientInitialDeposit {
                given: initial_deposit,
                required: MINIMUM_INITIAL_DEPOSIT,
            });
        }

        let account_id = self.last_account_id + 1;
        let mut account = Account::new(account_id, Amount::ZERO);
        account.adjust_balance(initial_deposit)?;
        account.append_transaction(TransactionEntry {
            account_id,
            kind: TransactionKind::Deposit,
            amount: initial_deposit,
            message: "opening deposit".to_owned(),
            resulting_balance: account.balance(),
            timestamp: self.storage.timestamp(),
        });

        let user = User::new(user_name, profile, account_id);
        self.accounts.insert(account_id, account);
        self.users.insert(user_name.to_owned(), user);
        self.last_account_id = account_id;

        self.persist()?;
        log::debug!("signed up {user_name:?} with account {account_id}");
        Ok(account_id)
    }

    /// An unknown username and a wrong password fail identically, so the
    /// caller learns nothing about which usernames exist.
    pub fn login(&self, user_name: &str, password: &str) -> Result<&User, StoreError> {
        match self.users.get(user_name) {
            Some(user) if user.matches_password(password) => Ok(user),
            _ => Err(StoreError::InvalidCredentials),
        }
    }

    pub fn deposit(&mut self, account_id: u32, amount: Amount) -> Result<Amount, StoreError> {
        if !amount.is_positive() || amount > MAXIMUM_DEPOSIT {
            return Err(StoreError::InvalidAmount(amount));
        }

        let timestamp = self.storage.timestamp();
        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(StoreError::StoreCorrupt(account_id))?;
        account.adjust_balance(amount)?;
        let balance = account.balance();
        account.append_transaction(TransactionEntry {
            account_id,
            kind: TransactionKind::Deposit,
            amount,
            message: String::new(),
            resulting_balance: balance,
            timestamp,
        });

        self.persist()?;
        Ok(balance)
    }

    pub fn withdraw(&mut self, account_id: u32, amount: Amount) -> Result<Amount, StoreError> {
        if !amount.is_positive() {
            return Err(StoreError::InvalidAmount(amount));
        }

        let timestamp = self.storage.timestamp();
        let debit = amount.negated()?;
        let account = self
            .accounts
            .get_mut(&account_id)
            .ok_or(StoreError::StoreCorrupt(account_id))?;
        if amount > account.balance() {
            return Err(StoreError::InsufficientFunds {
                requested: amount,
                available: account.balance(),
            });
        }

        account.adjust_balance(debit)?;
        let balance = account.balance();
        account.append_transaction(TransactionEntry {
            account_id,
            kind: TransactionKind::Withdraw,
            amount,
            message: String::new(),
            resulting_balance: balance,
            timestamp,
        });

        self.persist()?;
        Ok(balance)
    }

    /// Moves `amount` from the sender's account to the named recipient's.
    /// Both sides are validated and their new balances computed before
    /// either account is touched, then both mutations and both log entries
    /// (sharing one timestamp) land ahead of a single persist, so no
    /// partial transfer is ever observable. Returns the sender's balance.
    pub fn transfer(
        &mut self,
        sender_id: u32,
        receiver_user_name: &str,
        amount: Amount,
    ) -> Result<Amount, StoreError> {
        if !amount.is_positive() {
            return Err(StoreError::InvalidAmount(amount));
        }

        let receiver_id = self
            .users
            .get(receiver_user_name)
            .ok_or_else(|| StoreError::UnknownRecipient(receiver_user_name.to_owned()))?
            .account_id();
        if receiver_id == sender_id {
            return Err(StoreError::SelfTransferNotAllowed);
        }

        let sender_name = self
            .users
            .values()
            .find(|user| user.account_id() == sender_id)
            .map(|user| user.user_name().to_owned())
            .ok_or(StoreError::StoreCorrupt(sender_id))?;

        let sender_balance = self
            .accounts
            .get(&sender_id)
            .ok_or(StoreError::StoreCorrupt(sender_id))?
            .balance();
        if amount > sender_balance {
            return Err(StoreError::InsufficientFunds {
                requested: amount,
                available: sender_balance,
            });
        }
        let receiver_balance = self
            .accounts
            .get(&receiver_id)
            .ok_or(StoreError::StoreCorrupt(receiver_id))?
            .balance();

        // Both applications are proven here; nothing below can leave only
        // one side applied.
        let sender_after = sender_balance.sub(&amount)?;
        let receiver_after = receiver_balance.add(&amount)?;
        let debit = amount.negated()?;
        let timestamp = self.storage.timestamp();

        let sender = self
            .accounts
            .get_mut(&sender_id)
            .ok_or(StoreError::StoreCorrupt(sender_id))?;
        sender.adjust_balance(debit)?;
        sender.append_transaction(TransactionEntry {
            account_id: sender_id,
            kind: TransactionKind::TransferOut,
            amount,
            message: format!("to ({receiver_user_name})"),
            resulting_balance: sender_after,
            timestamp: timestamp.clone(),
        });

        let receiver = self
            .accounts
            .get_mut(&receiver_id)
            .ok_or(StoreError::StoreCorrupt(receiver_id))?;
        receiver.adjust_balance(amount)?;
        receiver.append_transaction(TransactionEntry {
            account_id: receiver_id,
            kind: TransactionKind::TransferIn,
            amount,
            message: format!("from ({sender_name})"),
            resulting_balance: receiver_after,
            timestamp,
        });

        self.persist()?;
        log::debug!("transferred {amount} from account {sender_id} to account {receiver_id}");
        Ok(sender_after)
    }

    /// Moves the user's index entry to the new username. Renaming to a taken
    /// name, or to the current one, is a duplicate.
    pub fn rename_user(
        &mut self,
        old_user_name: &str,
        new_user_name: &str,
    ) -> Result<(), StoreError> {
        if new_user_name == old_user_name || self.users.contains_key(new_user_name) {
            return Err(StoreError::DuplicateUsername(new_user_name.to_owned()));
        }
        let Some(mut user) = self.users.remove(old_user_name) else {
            return Err(StoreError::UnknownRecipient(old_user_name.to_owned()));
        };
        user.set_user_name(new_user_name);
        self.users.insert(new_user_name.to_owned(), user);

        // The lockout counter follows the user, not the name.
        if let Some(attempts) = self.password_attempts.remove(old_user_name) {
            self.password_attempts.insert(new_user_name.to_owned(), attempts);
        }

        self.persist()?;
        Ok(())
    }

    /// Replaces the password once the current one is confirmed. Each
    /// mismatch counts toward the attempt limit; reaching it locks this
    /// user's password changes until the store is reloaded.
    pub fn change_password(
        &mut self,
        user_name: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), StoreError> {
        let Some(user) = self.users.get_mut(user_name) else {
            return Err(StoreError::InvalidCredentials);
        };

        let attempts = self
            .password_attempts
            .entry(user_name.to_owned())
            .or_insert(0);
        if *attempts >= PASSWORD_ATTEMPT_LIMIT {
            log::warn!("password change for {user_name:?} is locked out");
            return Err(StoreError::InvalidCredentials);
        }
        if !user.matches_password(old_password) {
            *attempts += 1;
            log::warn!(
                "failed password change for {user_name:?} ({attempts} of {PASSWORD_ATTEMPT_LIMIT} attempts)",
            );
            return Err(StoreError::InvalidCredentials);
        }

        self.password_attempts.remove(user_name);
        user.set_password(new_password);
        self.persist()?;
        Ok(())
    }

    pub fn change_first_name(
        &mut self,
        user_name: &str,
        first_name: &str,
    ) -> Result<(), StoreError> {
        self.user_mut(user_name)?.set_first_name(first_name);
        self.persist()
    }

    pub fn change_last_name(&mut self, user_name: &str, last_name: &str) -> Result<(), StoreError> {
        self.user_mut(user_name)?.set_last_name(last_name);
        self.persist()
    }

    pub fn change_email(&mut self, user_name: &str, email: &str) -> Result<(), StoreError> {
        self.user_mut(user_name)?.set_email(email);
        self.persist()
    }

    pub fn user(&self, user_name: &str) -> Option<&User> {
        self.users.get(user_name)
    }

    pub fn account(&self, account_id: u32) -> Option<&Account> {
        self.accounts.get(&account_id)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn accounts(&self) -> impl Iterator<Item = &Account> {
        self.accounts.values()
    }

    pub fn last_account_id(&self) -> u32 {
        self.last_account_id
    }

    fn user_mut(&mut self, user_name: &str) -> Result<&mut User, StoreError> {
        self.users
            .get_mut(user_name)
            .ok_or_else(|| StoreError::UnknownRecipient(user_name.to_owned()))
    }
}
