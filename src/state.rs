use std::sync::Arc;

use crate::{
    config::Config,
    crypto::password::HashingParams,
    error::Result,
    repositories::{account::KvCredentialStore, session::KvSessionTable},
    services::{
        auth::{AuthService, DefaultAccount},
        statistics::StatisticsBoard,
    },
    storage::{file::FileKeyValueStore, kv::KeyValueStore},
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// Login, signup and session handling.
    pub auth: Arc<AuthService>,
    /// The latest statistics poll.
    pub statistics: StatisticsBoard,
}

impl AppState {
    /// Wires the stores and the auth service over a single key-value store.
    ///
    /// # Arguments
    ///
    /// * `kv` - The key-value store shared by every component.
    /// * `session_ttl` - How long a new session stays valid.
    /// * `hashing` - Argon2 parameters for new digests.
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        session_ttl: chrono::Duration,
        hashing: HashingParams,
    ) -> Self {
        let accounts = Arc::new(KvCredentialStore::new(kv.clone()));
        let sessions = Arc::new(KvSessionTable::new(kv.clone(), session_ttl));
        let auth = Arc::new(AuthService::new(accounts, sessions, kv, hashing));

        AppState {
            auth,
            statistics: StatisticsBoard::new(),
        }
    }

    /// Opens the data file named by the configuration and bootstraps the
    /// default account if enabled.
    pub fn from_config(config: &Config) -> Result<Self> {
        let kv = Arc::new(FileKeyValueStore::open(&config.data_file)?);
        tracing::info!("✅ Key-value store initialized");

        let state = Self::new(kv, config.session_ttl(), HashingParams::default());

        if config.bootstrap_admin {
            state
                .auth
                .ensure_default_account(&DefaultAccount::default())?;
        }

        Ok(state)
    }
}
