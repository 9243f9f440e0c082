use std::sync::{Arc, OnceLock};

use chrono::Utc;

use crate::{
    crypto::password::{HashingParams, hash_password, verify_password},
    error::{AppError, IdentifierKind, Result},
    models::{
        account::{Account, NewAccount, Plan},
        session::{Session, SessionId},
    },
    repositories::{account::CredentialStore, session::SessionTable},
    services::statistics::StatisticsSummary,
    storage::kv::{CURRENT_SESSION_KEY, KeyValueStore},
    validation::auth::{SignupRequest, validate_email, validate_password},
};

/// Verified against when no account matches a login identifier, so both
/// failure paths pay for one Argon2 verification.
const DUMMY_PASSWORD: &str = "sharedash-no-such-account";

/// Who is logged in: the account and the session that authenticated it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub account: Account,
    pub session: Session,
}

/// The account created on first start when the store is empty.
#[derive(Debug, Clone)]
pub struct DefaultAccount {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub plan: Plan,
}

impl Default for DefaultAccount {
    fn default() -> Self {
        Self {
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            username: "admin".to_string(),
            email: "admin@sharedash.local".to_string(),
            password: "admin123".to_string(),
            plan: Plan::Premium,
        }
    }
}

/// Orchestrates login, signup and logout over the credential store, the
/// session table and the current-session pointer.
pub struct AuthService {
    accounts: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionTable>,
    kv: Arc<dyn KeyValueStore>,
    hashing: HashingParams,
    dummy_digest: OnceLock<String>,
}

impl AuthService {
    /// Creates a new `AuthService`.
    ///
    /// # Arguments
    ///
    /// * `accounts` - The credential store.
    /// * `sessions` - The session table.
    /// * `kv` - The key-value store holding the current-session pointer.
    /// * `hashing` - Argon2 parameters for new digests.
    pub fn new(
        accounts: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionTable>,
        kv: Arc<dyn KeyValueStore>,
        hashing: HashingParams,
    ) -> Self {
        Self {
            accounts,
            sessions,
            kv,
            hashing,
            dummy_digest: OnceLock::new(),
        }
    }

    /// Digest of `DUMMY_PASSWORD` under this service's hashing cost, created
    /// on first use.
    fn dummy_digest(&self) -> Result<&str> {
        if let Some(digest) = self.dummy_digest.get() {
            return Ok(digest);
        }
        let digest = hash_password(DUMMY_PASSWORD, &self.hashing)?;
        Ok(self.dummy_digest.get_or_init(|| digest))
    }

    fn current_session_id(&self) -> Result<Option<SessionId>> {
        Ok(self.kv.get(CURRENT_SESSION_KEY)?.map(SessionId))
    }

    fn set_current_session(&self, id: &SessionId) -> Result<()> {
        self.kv.set(CURRENT_SESSION_KEY, &id.0)
    }

    fn clear_current_session(&self) -> Result<()> {
        self.kv.remove(CURRENT_SESSION_KEY)
    }

    /// Authenticates by username or email.
    ///
    /// An unknown identifier and a wrong password both fail with
    /// `InvalidCredentials`. On success `lastLogin` is updated, a new session
    /// becomes the current session and any previous current session is
    /// deleted.
    pub fn login(&self, identifier: &str, password: &str) -> Result<AuthContext> {
        let identifier = identifier.trim();
        tracing::debug!("🔐 Login attempt: {}", identifier);

        let found = match self.accounts.find_by_identifier(identifier) {
            Ok(account) => account,
            Err(AppError::NotFound) => {
                verify_password(password, self.dummy_digest()?)?;
                tracing::debug!("No account matches identifier");
                return Err(AppError::InvalidCredentials);
            }
            Err(e) => return Err(e),
        };

        if !verify_password(password, &found.credential_digest)? {
            tracing::debug!(account_id = %found.id, "Password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        // The digest must still be the one just verified; a concurrent
        // password change wins over this login.
        let account = self.accounts.modify(found.id, &mut |account| {
            if account.credential_digest != found.credential_digest {
                return Err(AppError::InvalidCredentials);
            }
            account.last_login = Some(Utc::now());
            Ok(())
        })?;

        let session = self.sessions.create(account.id)?;
        if let Some(previous) = self.current_session_id()? {
            if previous != session.id {
                self.sessions.delete(&previous)?;
            }
        }
        self.set_current_session(&session.id)?;

        tracing::info!("✅ User logged in: {}", account.username);
        Ok(AuthContext { account, session })
    }

    /// Registers a new free-plan account and logs it in.
    pub fn signup(&self, request: SignupRequest) -> Result<AuthContext> {
        let request = request.normalized();
        tracing::debug!("📝 Signup attempt: {}", request.username);

        request.check()?;

        let credential_digest = hash_password(&request.password, &self.hashing)?;
        let account = self
            .accounts
            .create(NewAccount {
                first_name: request.first_name,
                last_name: request.last_name,
                username: request.username,
                email: request.email,
                credential_digest,
                plan: Plan::Free,
            })
            .map_err(|e| match e {
                AppError::DuplicateIdentifier(IdentifierKind::Email) => AppError::EmailTaken,
                AppError::DuplicateIdentifier(IdentifierKind::Username) => AppError::UsernameTaken,
                other => other,
            })?;

        tracing::info!("✅ Account created with ID: {}", account.id);

        self.login(&account.email, &request.password)
    }

    /// Ends the current session. Calling it while logged out is a no-op.
    pub fn logout(&self) -> Result<()> {
        if let Some(id) = self.current_session_id()? {
            self.sessions.delete(&id)?;
            tracing::info!("👋 Session closed");
        }
        self.clear_current_session()
    }

    /// Resolves the current-session pointer to an authentication context.
    ///
    /// A pointer to a missing or expired session, or to a session whose
    /// account no longer exists, is cleared and reported as `None`.
    pub fn current(&self) -> Result<Option<AuthContext>> {
        let Some(id) = self.current_session_id()? else {
            return Ok(None);
        };

        let session = match self.sessions.get(&id) {
            Ok(session) => session,
            Err(AppError::NotFound) => {
                self.clear_current_session()?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let account = match self.accounts.find_by_id(session.account_id) {
            Ok(account) => account,
            Err(AppError::NotFound) => {
                tracing::warn!(account_id = %session.account_id, "Session owner no longer exists");
                self.sessions.delete(&id)?;
                self.clear_current_session()?;
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(Some(AuthContext { account, session }))
    }

    pub fn is_authenticated(&self) -> Result<bool> {
        Ok(self.current()?.is_some())
    }

    /// Like [`AuthService::current`], but fails with `Unauthorized` when
    /// nobody is logged in.
    pub fn require_current(&self) -> Result<AuthContext> {
        self.current()?.ok_or(AppError::Unauthorized)
    }

    /// Creates the bootstrap account when the credential store is empty.
    /// Signup password rules do not apply here.
    pub fn ensure_default_account(&self, defaults: &DefaultAccount) -> Result<Option<Account>> {
        if self.accounts.count()? > 0 {
            return Ok(None);
        }

        let credential_digest = hash_password(&defaults.password, &self.hashing)?;
        let account = self.accounts.create(NewAccount {
            first_name: defaults.first_name.clone(),
            last_name: defaults.last_name.clone(),
            username: defaults.username.clone(),
            email: defaults.email.clone(),
            credential_digest,
            plan: defaults.plan,
        })?;

        tracing::info!("✅ Default account created: {}", account.username);
        Ok(Some(account))
    }

    /// Replaces the password of the authenticated account.
    pub fn change_password(
        &self,
        ctx: &AuthContext,
        old_password: &str,
        new_password: &str,
    ) -> Result<Account> {
        tracing::info!("🔑 Changing password for user: {}", ctx.account.id);

        let verified = self.accounts.find_by_id(ctx.account.id)?.credential_digest;

        if !verify_password(old_password, &verified)? {
            return Err(AppError::InvalidCredentials);
        }

        validate_password(new_password)?;

        let mut new_digest = Some(hash_password(new_password, &self.hashing)?);
        let account = self.accounts.modify(ctx.account.id, &mut |account| {
            if account.credential_digest != verified {
                return Err(AppError::InvalidCredentials);
            }
            if let Some(digest) = new_digest.take() {
                account.credential_digest = digest;
            }
            Ok(())
        })?;

        tracing::info!("✅ Password changed for user: {}", account.id);
        Ok(account)
    }

    /// Accepts a password reset request. The outcome does not reveal whether
    /// the address is registered, and no mail is sent.
    pub fn request_password_reset(&self, email: &str) -> Result<()> {
        let email = email.trim();
        validate_email(email)?;

        match self.accounts.find_by_identifier(email) {
            Ok(account) => tracing::info!(account_id = %account.id, "Password reset requested"),
            Err(AppError::NotFound) => tracing::info!("Password reset requested for unknown email"),
            Err(e) => return Err(e),
        }

        Ok(())
    }

    /// Copies the feed's share totals into the account's stats.
    pub fn apply_statistics(
        &self,
        ctx: &AuthContext,
        summary: &StatisticsSummary,
    ) -> Result<Account> {
        let account = self.accounts.find_by_id(ctx.account.id)?;

        if account.share_stats.total_shares == summary.total_shares
            && account.share_stats.active_sessions == summary.active_sessions
        {
            return Ok(account);
        }

        self.accounts.modify(ctx.account.id, &mut |account| {
            account.share_stats.total_shares = summary.total_shares;
            account.share_stats.active_sessions = summary.active_sessions;
            Ok(())
        })
    }

    /// Sweeps expired sessions and logs out the current context if its
    /// session was among them. Returns how many sessions were removed.
    pub fn expire_current_session(&self) -> Result<usize> {
        let removed = self.sessions.sweep_expired()?;

        if let Some(id) = self.current_session_id()? {
            match self.sessions.get(&id) {
                Ok(_) => {}
                Err(AppError::NotFound) => {
                    tracing::warn!("Session expired. Please login again.");
                    self.clear_current_session()?;
                }
                Err(e) => return Err(e),
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use chrono::Duration;

    use crate::{
        models::{account::ShareStats, session::SessionId},
        repositories::{account::KvCredentialStore, session::KvSessionTable},
        storage::{kv::SESSIONS_KEY, memory::MemoryKeyValueStore},
        validation::auth::{PasswordRule, ValidationError},
    };

    struct Harness {
        kv: Arc<MemoryKeyValueStore>,
        sessions: Arc<KvSessionTable>,
        auth: AuthService,
    }

    fn harness() -> Harness {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let accounts = Arc::new(KvCredentialStore::new(kv.clone()));
        let sessions = Arc::new(KvSessionTable::new(kv.clone(), Duration::days(7)));
        let auth = AuthService::new(
            accounts,
            sessions.clone(),
            kv.clone(),
            HashingParams::fast(),
        );
        auth.ensure_default_account(&DefaultAccount::default())
            .unwrap();
        Harness { kv, sessions, auth }
    }

    fn signup_request(username: &str, email: &str) -> SignupRequest {
        SignupRequest {
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password: "abc123!@".to_string(),
            confirm_password: "abc123!@".to_string(),
        }
    }

    /// Rewrites the stored session so that it expired a minute ago.
    fn expire_in_storage(kv: &MemoryKeyValueStore, id: &SessionId) {
        let json = kv.get(SESSIONS_KEY).unwrap().unwrap();
        let mut sessions: HashMap<SessionId, Session> = sonic_rs::from_str(&json).unwrap();
        let session = sessions.get_mut(id).unwrap();
        session.expires_at = Utc::now() - Duration::minutes(1);
        kv.set(SESSIONS_KEY, &sonic_rs::to_string(&sessions).unwrap())
            .unwrap();
    }

    #[test]
    fn test_signup_then_authenticated() {
        let h = harness();
        let ctx = h
            .auth
            .signup(signup_request("grace", "grace@example.com"))
            .unwrap();

        assert!(h.auth.is_authenticated().unwrap());
        let current = h.auth.current().unwrap().unwrap();
        assert_eq!(current.account.id, ctx.account.id);
        assert_eq!(current.account.plan, Plan::Free);
        assert_eq!(current.account.share_stats, ShareStats::default());
        assert!(current.account.last_login.is_some());
        assert_ne!(current.account.credential_digest, "abc123!@");
    }

    #[test]
    fn test_signup_with_taken_email() {
        let h = harness();
        h.auth
            .signup(signup_request("grace", "grace@example.com"))
            .unwrap();

        let err = h
            .auth
            .signup(signup_request("someone-else", "grace@example.com"))
            .unwrap_err();
        assert!(matches!(err, AppError::EmailTaken));

        let err = h
            .auth
            .signup(signup_request("grace", "grace@example.com"))
            .unwrap_err();
        assert!(matches!(err, AppError::EmailTaken));

        let err = h
            .auth
            .signup(signup_request("grace", "other@example.com"))
            .unwrap_err();
        assert!(matches!(err, AppError::UsernameTaken));
    }

    #[test]
    fn test_signup_validation_errors() {
        let h = harness();

        let mut weak = signup_request("weak", "weak@example.com");
        weak.password = "abc12345".to_string();
        weak.confirm_password = "abc12345".to_string();
        assert!(matches!(
            h.auth.signup(weak).unwrap_err(),
            AppError::Validation(ValidationError::WeakPassword(PasswordRule::MissingSymbol))
        ));

        let mut mismatch = signup_request("mismatch", "mismatch@example.com");
        mismatch.confirm_password = "abc123!#".to_string();
        assert!(matches!(
            h.auth.signup(mismatch).unwrap_err(),
            AppError::Validation(ValidationError::PasswordMismatch)
        ));

        let bad_email = signup_request("bademail", "not-an-email");
        assert!(matches!(
            h.auth.signup(bad_email).unwrap_err(),
            AppError::Validation(ValidationError::InvalidEmail)
        ));

        assert!(!h.auth.is_authenticated().unwrap());
    }

    #[test]
    fn test_default_account_login() {
        let h = harness();
        let ctx = h.auth.login("admin", "admin123").unwrap();

        assert_eq!(ctx.account.plan, Plan::Premium);
        assert_eq!(
            ctx.session.expires_at,
            ctx.session.created_at + Duration::days(7)
        );
        assert_eq!(ctx.session.account_id, ctx.account.id);

        // Also reachable by email
        assert!(h.auth.login("admin@sharedash.local", "admin123").is_ok());
    }

    #[test]
    fn test_default_account_created_once() {
        let h = harness();
        assert!(
            h.auth
                .ensure_default_account(&DefaultAccount::default())
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_login_failures_are_indistinguishable() {
        let h = harness();
        let unknown = h.auth.login("nobody", "abc123!@").unwrap_err();
        let wrong = h.auth.login("admin", "wrong-password").unwrap_err();

        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert!(!h.auth.is_authenticated().unwrap());
    }

    #[test]
    fn test_unknown_identifier_still_verifies_a_digest() {
        let h = harness();
        assert!(h.auth.dummy_digest.get().is_none());

        assert!(matches!(
            h.auth.login("nobody", "abc123!@"),
            Err(AppError::InvalidCredentials)
        ));

        let digest = h.auth.dummy_digest.get().unwrap();
        assert!(digest.starts_with("$argon2id$"));
        assert!(verify_password(DUMMY_PASSWORD, digest).unwrap());

        // A known identifier never builds it
        let fresh = harness();
        let _ = fresh.auth.login("admin", "wrong-password");
        assert!(fresh.auth.dummy_digest.get().is_none());
    }

    #[test]
    fn test_relogin_replaces_current_session() {
        let h = harness();
        let first = h.auth.login("admin", "admin123").unwrap();
        let second = h.auth.login("admin", "admin123").unwrap();

        assert_ne!(first.session.id, second.session.id);
        assert!(matches!(
            h.sessions.get(&first.session.id),
            Err(AppError::NotFound)
        ));
        assert_eq!(
            h.auth.current().unwrap().unwrap().session.id,
            second.session.id
        );
    }

    #[test]
    fn test_logout_twice() {
        let h = harness();
        let ctx = h.auth.login("admin", "admin123").unwrap();

        h.auth.logout().unwrap();
        h.auth.logout().unwrap();

        assert!(!h.auth.is_authenticated().unwrap());
        assert!(matches!(
            h.sessions.get(&ctx.session.id),
            Err(AppError::NotFound)
        ));
        assert_eq!(h.kv.get(CURRENT_SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_logout_without_session() {
        let h = harness();
        h.auth.logout().unwrap();
        assert!(!h.auth.is_authenticated().unwrap());
    }

    #[test]
    fn test_expired_session_clears_pointer() {
        let h = harness();
        let ctx = h.auth.login("admin", "admin123").unwrap();
        expire_in_storage(&h.kv, &ctx.session.id);

        assert!(!h.auth.is_authenticated().unwrap());
        assert_eq!(h.kv.get(CURRENT_SESSION_KEY).unwrap(), None);
        assert_eq!(h.sessions.len().unwrap(), 0);
        assert!(matches!(h.auth.require_current(), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_expire_current_session_logs_out() {
        let h = harness();
        let ctx = h.auth.login("admin", "admin123").unwrap();

        assert_eq!(h.auth.expire_current_session().unwrap(), 0);
        assert!(h.auth.is_authenticated().unwrap());

        expire_in_storage(&h.kv, &ctx.session.id);
        assert_eq!(h.auth.expire_current_session().unwrap(), 1);
        assert_eq!(h.kv.get(CURRENT_SESSION_KEY).unwrap(), None);
    }

    #[test]
    fn test_change_password() {
        let h = harness();
        let ctx = h
            .auth
            .signup(signup_request("grace", "grace@example.com"))
            .unwrap();

        assert!(matches!(
            h.auth.change_password(&ctx, "wrong!123", "new-pass1!"),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            h.auth.change_password(&ctx, "abc123!@", "short1!"),
            Err(AppError::Validation(_))
        ));

        h.auth
            .change_password(&ctx, "abc123!@", "new-pass1!")
            .unwrap();
        h.auth.logout().unwrap();

        assert!(h.auth.login("grace", "abc123!@").is_err());
        assert!(h.auth.login("grace", "new-pass1!").is_ok());
    }

    #[test]
    fn test_concurrent_logins_keep_new_password() {
        let h = Arc::new(harness());
        let ctx = h.auth.login("admin", "admin123").unwrap();

        let logins: Vec<_> = (0..4)
            .map(|_| {
                let h = h.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        let _ = h.auth.login("admin", "admin123");
                    }
                })
            })
            .collect();

        h.auth
            .change_password(&ctx, "admin123", "n3w-pass!")
            .unwrap();
        for login in logins {
            login.join().unwrap();
        }

        assert!(matches!(
            h.auth.login("admin", "admin123"),
            Err(AppError::InvalidCredentials)
        ));
        assert!(h.auth.login("admin", "n3w-pass!").is_ok());
    }

    #[test]
    fn test_login_keeps_applied_statistics() {
        let h = harness();
        let ctx = h.auth.login("admin", "admin123").unwrap();
        h.auth
            .apply_statistics(
                &ctx,
                &StatisticsSummary {
                    total_shares: 7,
                    active_sessions: 1,
                    ..Default::default()
                },
            )
            .unwrap();

        let again = h.auth.login("admin", "admin123").unwrap();
        assert_eq!(again.account.share_stats.total_shares, 7);
        assert_eq!(again.account.share_stats.active_sessions, 1);
    }

    #[test]
    fn test_password_reset_request() {
        let h = harness();
        assert!(h.auth.request_password_reset("admin@sharedash.local").is_ok());
        assert!(h.auth.request_password_reset("unknown@example.com").is_ok());
        assert!(matches!(
            h.auth.request_password_reset("not-an-email"),
            Err(AppError::Validation(ValidationError::InvalidEmail))
        ));
    }

    #[test]
    fn test_apply_statistics_updates_account() {
        let h = harness();
        let ctx = h.auth.login("admin", "admin123").unwrap();

        let account = h
            .auth
            .apply_statistics(
                &ctx,
                &StatisticsSummary {
                    processed: 10,
                    active_sessions: 2,
                    success_rate: 80.0,
                    total_shares: 12,
                },
            )
            .unwrap();

        assert_eq!(account.share_stats.total_shares, 12);
        assert_eq!(account.share_stats.active_sessions, 2);

        let current = h.auth.current().unwrap().unwrap();
        assert_eq!(current.account.share_stats.total_shares, 12);
    }
}
