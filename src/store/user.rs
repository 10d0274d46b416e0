use std::fmt;

/// Profile fields collected at sign-up, before an account id exists.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// An identity/credentials record, bound 1:1 to an account.
///
/// The username and account id are identity keys: the ledger indexes users by
/// username, so both are only reachable through the ledger's own rename and
/// sign-up paths (crate-private setters).
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    first_name: String,
    last_name: String,
    email: String,
    user_name: String,
    password: String,
    account_id: u32,
}

impl User {
    pub fn new(user_name: &str, profile: Profile, account_id: u32) -> Self {
        User {
            first_name: profile.first_name,
            last_name: profile.last_name,
            email: profile.email,
            user_name: user_name.to_owned(),
            password: profile.password,
            account_id,
        }
    }

    pub(crate) fn from_fields(
        first_name: String,
        last_name: String,
        email: String,
        user_name: String,
        password: String,
        account_id: u32,
    ) -> Self {
        User {
            first_name,
            last_name,
            email,
            user_name,
            password,
            account_id,
        }
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn account_id(&self) -> u32 {
        self.account_id
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }

    /// Exact string comparison against the stored plaintext password.
    /// Known weakness kept on purpose: passwords are persisted and compared
    /// in the clear, and the lockout rules depend on that exact behavior.
    pub fn matches_password(&self, candidate: &str) -> bool {
        self.password == candidate
    }

    pub fn set_first_name(&mut self, first_name: &str) {
        self.first_name = first_name.to_owned();
    }

    pub fn set_last_name(&mut self, last_name: &str) {
        self.last_name = last_name.to_owned();
    }

    pub fn set_email(&mut self, email: &str) {
        self.email = email.to_owned();
    }

    pub(crate) fn set_user_name(&mut self, user_name: &str) {
        self.user_name = user_name.to_owned();
    }

    pub(crate) fn set_password(&mut self, password: &str) {
        self.password = password.to_owned();
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} <{}>", self.first_name, self.last_name, self.email)
    }
}
