//! Key-value storage surface shared by the credential store, the session
//! table and the current-session pointer.

use crate::error::Result;

/// Key holding the JSON array of account records.
pub const ACCOUNTS_KEY: &str = "sharedash_accounts";
/// Key holding the JSON object of session records keyed by session id.
pub const SESSIONS_KEY: &str = "sharedash_sessions";
/// Key holding the id of the session that is currently logged in.
pub const CURRENT_SESSION_KEY: &str = "sharedash_current_session";

/// A synchronous string key-value store, the analogue of a browser
/// profile's local storage.
pub trait KeyValueStore: Send + Sync {
    /// Get the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`; no-op if absent
    fn remove(&self, key: &str) -> Result<()>;
}
