use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Premium,
}

/// Per-account share counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShareStats {
    pub total_shares: u64,
    pub successful_shares: u64,
    pub failed_shares: u64,
    pub active_sessions: u64,
}

impl ShareStats {
    /// Successful shares as a rounded percentage of all shares; `0` when
    /// nothing has been shared yet.
    pub fn success_rate(&self) -> u64 {
        if self.total_shares == 0 {
            return 0;
        }
        ((self.successful_shares as f64 / self.total_shares as f64) * 100.0).round() as u64
    }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// The unique identifier for the account.
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    /// Unique across all accounts.
    pub username: String,
    /// Unique across all accounts, stored lowercased.
    pub email: String,
    /// Argon2id PHC string. Never the password itself.
    pub credential_digest: String,
    pub plan: Plan,
    /// The timestamp when the account was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp of the last successful login.
    pub last_login: Option<DateTime<Utc>>,
    #[serde(default)]
    pub share_stats: ShareStats,
}

/// Input for creating an account; the store assigns nothing, the caller
/// supplies an already-derived digest.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub credential_digest: String,
    pub plan: Plan,
}

impl NewAccount {
    /// Builds the stored record with a fresh id, zeroed stats and no login.
    pub fn into_account(self, now: DateTime<Utc>) -> Account {
        Account {
            id: AccountId::new(),
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            email: self.email.to_lowercase(),
            credential_digest: self.credential_digest,
            plan: self.plan,
            created_at: now,
            last_login: None,
            share_stats: ShareStats::default(),
        }
    }
}

/// The account as shown to the UI. Excludes the credential digest.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountProfile {
    pub id: AccountId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub plan: Plan,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub share_stats: ShareStats,
    pub success_rate: u64,
}

impl From<&Account> for AccountProfile {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            username: account.username.clone(),
            email: account.email.clone(),
            plan: account.plan,
            created_at: account.created_at,
            last_login: account.last_login,
            share_stats: account.share_stats,
            success_rate: account.share_stats.success_rate(),
        }
    }
}
