//! Session table: session records kept as one JSON object keyed by session
//! id in the key-value store.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};

use crate::{
    crypto::token::generate_session_token,
    error::{AppError, Result},
    models::{
        account::AccountId,
        session::{Session, SessionId},
    },
    storage::kv::{KeyValueStore, SESSIONS_KEY},
};

/// Trait for session storage
pub trait SessionTable: Send + Sync {
    /// Create a session for an account, expiring after the table's lifetime
    fn create(&self, account_id: AccountId) -> Result<Session>;

    /// Get an unexpired session. An expired session is deleted and reported
    /// as `NotFound`.
    fn get(&self, id: &SessionId) -> Result<Session>;

    /// Delete a session; no-op if absent
    fn delete(&self, id: &SessionId) -> Result<()>;

    /// Delete every expired session, returning how many were removed
    fn sweep_expired(&self) -> Result<usize>;

    /// Number of stored sessions, expired or not
    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Session table backed by a key-value store.
pub struct KvSessionTable {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
    write_guard: Mutex<()>,
}

impl KvSessionTable {
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self {
            kv,
            ttl,
            write_guard: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<SessionId, Session>> {
        match self.kv.get(SESSIONS_KEY)? {
            Some(json) => Ok(sonic_rs::from_str(&json)?),
            None => Ok(HashMap::new()),
        }
    }

    fn save(&self, sessions: &HashMap<SessionId, Session>) -> Result<()> {
        let json = sonic_rs::to_string(sessions)?;
        self.kv.set(SESSIONS_KEY, &json)
    }
}

impl SessionTable for KvSessionTable {
    fn create(&self, account_id: AccountId) -> Result<Session> {
        let session = Session::new(
            SessionId(generate_session_token()),
            account_id,
            Utc::now(),
            self.ttl,
        );

        let _guard = self.write_guard.lock()?;
        let mut sessions = self.load()?;
        sessions.insert(session.id.clone(), session.clone());
        self.save(&sessions)?;

        tracing::debug!(%account_id, expires_at = %session.expires_at, "Session created");
        Ok(session)
    }

    fn get(&self, id: &SessionId) -> Result<Session> {
        let _guard = self.write_guard.lock()?;
        let mut sessions = self.load()?;

        let session = sessions.get(id).cloned().ok_or(AppError::NotFound)?;
        if session.is_expired_at(Utc::now()) {
            tracing::warn!(account_id = %session.account_id, "Session expired, removing");
            sessions.remove(id);
            self.save(&sessions)?;
            return Err(AppError::NotFound);
        }

        Ok(session)
    }

    fn delete(&self, id: &SessionId) -> Result<()> {
        let _guard = self.write_guard.lock()?;
        let mut sessions = self.load()?;
        if sessions.remove(id).is_some() {
            self.save(&sessions)?;
        }
        Ok(())
    }

    fn sweep_expired(&self) -> Result<usize> {
        let _guard = self.write_guard.lock()?;
        let mut sessions = self.load()?;

        let now = Utc::now();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired_at(now));
        let removed = before - sessions.len();

        if removed > 0 {
            self.save(&sessions)?;
        }
        Ok(removed)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.load()?.len())
    }
}
