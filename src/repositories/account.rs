//! Credential store: account records kept as one JSON array in the
//! key-value store.

use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::{
    error::{AppError, IdentifierKind, Result},
    models::account::{Account, AccountId, NewAccount},
    storage::kv::{ACCOUNTS_KEY, KeyValueStore},
};

/// Trait for account storage
pub trait CredentialStore: Send + Sync {
    /// Create an account; fails with `DuplicateIdentifier` if the email or
    /// username is already registered (email is checked first)
    fn create(&self, account: NewAccount) -> Result<Account>;

    /// Find the account whose username equals `identifier`, or whose email
    /// equals it ignoring case
    fn find_by_identifier(&self, identifier: &str) -> Result<Account>;

    /// Find an account by id
    fn find_by_id(&self, id: AccountId) -> Result<Account>;

    /// Replace the stored record with the same id
    fn update(&self, account: &Account) -> Result<()>;

    /// Load the record with `id`, apply `change` and store the result as one
    /// step. Nothing is written when `change` fails.
    fn modify(
        &self,
        id: AccountId,
        change: &mut dyn FnMut(&mut Account) -> Result<()>,
    ) -> Result<Account>;

    /// Number of stored accounts
    fn count(&self) -> Result<usize>;
}

/// Credential store backed by a key-value store.
pub struct KvCredentialStore {
    kv: Arc<dyn KeyValueStore>,
    write_guard: Mutex<()>,
}

impl KvCredentialStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_guard: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<Vec<Account>> {
        match self.kv.get(ACCOUNTS_KEY)? {
            Some(json) => Ok(sonic_rs::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, accounts: &[Account]) -> Result<()> {
        let json = sonic_rs::to_string(accounts)?;
        self.kv.set(ACCOUNTS_KEY, &json)
    }
}

fn matches_identifier(account: &Account, identifier: &str) -> bool {
    account.username == identifier || account.email.eq_ignore_ascii_case(identifier)
}

impl CredentialStore for KvCredentialStore {
    fn create(&self, account: NewAccount) -> Result<Account> {
        let _guard = self.write_guard.lock()?;
        let mut accounts = self.load()?;

        if accounts
            .iter()
            .any(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            return Err(AppError::DuplicateIdentifier(IdentifierKind::Email));
        }
        if accounts.iter().any(|a| a.username == account.username) {
            return Err(AppError::DuplicateIdentifier(IdentifierKind::Username));
        }

        let account = account.into_account(Utc::now());
        accounts.push(account.clone());
        self.save(&accounts)?;

        tracing::debug!(account_id = %account.id, "Account stored");
        Ok(account)
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Account> {
        self.load()?
            .into_iter()
            .find(|a| matches_identifier(a, identifier))
            .ok_or(AppError::NotFound)
    }

    fn find_by_id(&self, id: AccountId) -> Result<Account> {
        self.load()?
            .into_iter()
            .find(|a| a.id == id)
            .ok_or(AppError::NotFound)
    }

    fn update(&self, account: &Account) -> Result<()> {
        self.modify(account.id, &mut |slot| {
            *slot = account.clone();
            Ok(())
        })?;
        Ok(())
    }

    fn modify(
        &self,
        id: AccountId,
        change: &mut dyn FnMut(&mut Account) -> Result<()>,
    ) -> Result<Account> {
        let _guard = self.write_guard.lock()?;
        let mut accounts = self.load()?;

        let slot = accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(AppError::NotFound)?;
        change(slot)?;
        let account = slot.clone();

        self.save(&accounts)?;
        Ok(account)
    }

    fn count(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }
}
