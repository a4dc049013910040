//! Session Service
//!
//! Orchestrates the credential hasher, token codec and the two stores into
//! the four session operations: register, authenticate, revoke and
//! validate.

use crate::config::SessionConfig;
use crate::error::{ConflictField, SessionError};
use crate::models::*;
use crate::password::{CredentialHasher, PasswordMismatch};
use crate::store::{AccountStore, SessionStore};
use crate::token::TokenCodec;

use std::sync::Arc;
use validator::Validate;

/// Session manager
///
/// Holds no mutable state of its own; everything that changes lives in the
/// stores, so one instance can be shared across request handlers.
pub struct SessionManager {
    accounts: Arc<dyn AccountStore>,
    sessions: Arc<dyn SessionStore>,
    hasher: Arc<CredentialHasher>,
    codec: TokenCodec,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(
        config: &SessionConfig,
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, SessionError> {
        Ok(Self {
            accounts,
            sessions,
            hasher: Arc::new(CredentialHasher::new(config)?),
            codec: TokenCodec::new(config),
        })
    }

    /// Create a session manager over a single store holding both tables
    pub fn with_store<S>(config: &SessionConfig, store: Arc<S>) -> Result<Self, SessionError>
    where
        S: AccountStore + SessionStore + 'static,
    {
        Self::new(config, store.clone(), store)
    }

    /// Assemble from already-built parts
    pub fn from_parts(
        accounts: Arc<dyn AccountStore>,
        sessions: Arc<dyn SessionStore>,
        hasher: CredentialHasher,
        codec: TokenCodec,
    ) -> Self {
        Self {
            accounts,
            sessions,
            hasher: Arc::new(hasher),
            codec,
        }
    }

    /// Run Argon2 work on the blocking pool, off the async workers
    async fn with_hasher<T, F>(&self, f: F) -> Result<T, SessionError>
    where
        F: FnOnce(&CredentialHasher) -> T + Send + 'static,
        T: Send + 'static,
    {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || f(&hasher))
            .await
            .map_err(|e| {
                tracing::error!("Password hashing task failed: {}", e);
                SessionError::Internal
            })
    }

    // ============================================
    // Registration
    // ============================================

    /// Register a new account
    ///
    /// The existence checks are a fast path for a friendly error; the
    /// store's unique constraint is what actually settles two concurrent
    /// registrations for the same name.
    pub async fn register(&self, req: RegisterRequest) -> Result<AccountResponse, SessionError> {
        req.validate()
            .map_err(|e| SessionError::Validation(e.to_string()))?;

        let username_taken = self.accounts.exists_username(&req.username).await?;
        let email_taken = self.accounts.exists_email(&req.email).await?;

        if username_taken || email_taken {
            let mut fields = Vec::new();
            if username_taken {
                fields.push(ConflictField::Username);
            }
            if email_taken {
                fields.push(ConflictField::Email);
            }
            return Err(SessionError::Conflict(fields));
        }

        let RegisterRequest {
            username,
            email,
            password,
        } = req;
        let password_hash = self.with_hasher(move |h| h.hash(&password)).await??;

        let account = self
            .accounts
            .insert_account(NewAccount {
                username,
                email,
                password_hash,
            })
            .await?;

        tracing::info!(account_id = %account.id, "Account registered");

        Ok(account.into())
    }

    // ============================================
    // Authentication
    // ============================================

    /// Check a username/password pair and issue a session token.
    ///
    /// Unknown usernames and wrong passwords both return `NotFound`, and
    /// both pay for one hash verification.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<String, SessionError> {
        let password = password.to_owned();
        let Some(credential) = self.accounts.find_credential_by_username(username).await? else {
            self.with_hasher(move |h| h.verify_dummy(&password)).await?;
            return Err(SessionError::NotFound);
        };
        let AccountCredential {
            account_id,
            password_hash,
        } = credential;

        match self
            .with_hasher(move |h| h.verify(&password_hash, &password))
            .await?
        {
            Ok(()) => {}
            Err(PasswordMismatch::WrongPassword) => return Err(SessionError::NotFound),
            Err(PasswordMismatch::MalformedHash) => {
                tracing::warn!(
                    account_id = %account_id,
                    "Stored password hash could not be parsed"
                );
                return Err(SessionError::NotFound);
            }
        }

        let token = self.codec.mint(account_id)?;

        // A token already on record is handed back as-is.
        if self.sessions.session_exists(account_id, &token).await? {
            return Ok(token);
        }

        self.sessions.insert_session(account_id, &token).await?;

        tracing::info!(account_id = %account_id, "Session token issued");

        Ok(token)
    }

    // ============================================
    // Token Management
    // ============================================

    /// Revoke a token. Revoking an already revoked token succeeds.
    pub async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let account_id = self.codec.extract(token)?;

        self.sessions.delete_session(account_id, token).await?;

        tracing::info!(account_id = %account_id, "Session token revoked");

        Ok(())
    }

    /// Whether a token is currently valid.
    ///
    /// Undecodable tokens are simply not valid. Only store failures are
    /// errors.
    pub async fn validate_token(&self, token: &str) -> Result<bool, SessionError> {
        let Ok(account_id) = self.codec.extract(token) else {
            return Ok(false);
        };

        self.sessions.session_exists(account_id, token).await
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("hasher", &self.hasher)
            .field("codec", &self.codec)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use tokio_test::{assert_err, assert_ok};
    use uuid::Uuid;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn manager_over(store: Arc<MemoryStore>) -> SessionManager {
        SessionManager::from_parts(
            store.clone(),
            store,
            CredentialHasher::with_params(64, 1, 1).unwrap(),
            TokenCodec::from_secret(SECRET, None),
        )
    }

    fn manager() -> (SessionManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (manager_over(store.clone()), store)
    }

    #[tokio::test]
    async fn test_register_rejects_empty_fields() {
        let (manager, store) = manager();

        for req in [
            RegisterRequest::new("", "a@x.com", "p"),
            RegisterRequest::new("a", "", "p"),
            RegisterRequest::new("a", "a@x.com", ""),
        ] {
            let err = assert_err!(manager.register(req).await);
            assert!(matches!(err, SessionError::Validation(_)));
        }
        assert_eq!(store.account_count().await, 0);
    }

    #[tokio::test]
    async fn test_register_reports_both_conflicts() {
        let (manager, _) = manager();
        assert_ok!(
            manager
                .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
                .await
        );

        let err = assert_err!(
            manager
                .register(RegisterRequest::new("alice", "alice@x.com", "p2"))
                .await
        );
        assert_eq!(
            err,
            SessionError::Conflict(vec![ConflictField::Username, ConflictField::Email])
        );

        let err = assert_err!(
            manager
                .register(RegisterRequest::new("bob", "alice@x.com", "p2"))
                .await
        );
        assert_eq!(err, SessionError::Conflict(vec![ConflictField::Email]));
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_password() {
        let (manager, store) = manager();
        let account = assert_ok!(
            manager
                .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
                .await
        );

        let credential = store
            .find_credential_by_username("alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(credential.account_id, account.id);
        assert_ne!(credential.password_hash, "p1");
        assert!(credential.password_hash.starts_with("$argon2id$"));
    }

    /// Account store whose existence checks always miss, as if a
    /// concurrent registration landed between the check and the insert.
    struct RacingAccounts(MemoryStore);

    #[async_trait]
    impl AccountStore for RacingAccounts {
        async fn exists_username(&self, _: &str) -> Result<bool, SessionError> {
            Ok(false)
        }

        async fn exists_email(&self, _: &str) -> Result<bool, SessionError> {
            Ok(false)
        }

        async fn insert_account(&self, account: NewAccount) -> Result<Account, SessionError> {
            self.0.insert_account(account).await
        }

        async fn find_credential_by_username(
            &self,
            username: &str,
        ) -> Result<Option<AccountCredential>, SessionError> {
            self.0.find_credential_by_username(username).await
        }
    }

    #[tokio::test]
    async fn test_insert_conflict_surfaces_as_conflict() {
        let accounts = Arc::new(RacingAccounts(MemoryStore::new()));
        let manager = SessionManager::from_parts(
            accounts,
            Arc::new(MemoryStore::new()),
            CredentialHasher::with_params(64, 1, 1).unwrap(),
            TokenCodec::from_secret(SECRET, None),
        );

        assert_ok!(
            manager
                .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
                .await
        );
        let err = assert_err!(
            manager
                .register(RegisterRequest::new("alice", "other@x.com", "p2"))
                .await
        );
        assert_eq!(err, SessionError::Conflict(vec![ConflictField::Username]));
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_uniform() {
        let (manager, _) = manager();
        assert_ok!(
            manager
                .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
                .await
        );

        let wrong_password = assert_err!(manager.authenticate("alice", "nope").await);
        let unknown_user = assert_err!(manager.authenticate("mallory", "p1").await);

        assert_eq!(wrong_password, SessionError::NotFound);
        assert_eq!(unknown_user, SessionError::NotFound);
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn test_authenticate_with_malformed_hash_is_not_found() {
        let (manager, store) = manager();
        store
            .insert_account(NewAccount {
                username: "legacy".into(),
                email: "legacy@x.com".into(),
                password_hash: "$2a$10$notargon".into(),
            })
            .await
            .unwrap();

        let err = assert_err!(manager.authenticate("legacy", "whatever").await);
        assert_eq!(err, SessionError::NotFound);
    }

    #[tokio::test]
    async fn test_authenticate_issues_stored_token() {
        let (manager, store) = manager();
        let account = manager
            .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
            .await
            .unwrap();

        let token = assert_ok!(manager.authenticate("alice", "p1").await);

        assert!(store.session_exists(account.id, &token).await.unwrap());
        assert!(manager.validate_token(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_back_to_back_logins_get_separate_sessions() {
        let (manager, store) = manager();
        let account = manager
            .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
            .await
            .unwrap();

        let laptop = manager.authenticate("alice", "p1").await.unwrap();
        let phone = manager.authenticate("alice", "p1").await.unwrap();

        assert_ne!(laptop, phone);
        assert_eq!(store.sessions_for(account.id).await.len(), 2);

        manager.revoke(&laptop).await.unwrap();

        assert!(!manager.validate_token(&laptop).await.unwrap());
        assert!(manager.validate_token(&phone).await.unwrap());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_hashing_runs_off_the_runtime_thread() {
        let (manager, _) = manager();
        let runtime_thread = std::thread::current().id();

        let hashing_thread = manager
            .with_hasher(|_| std::thread::current().id())
            .await
            .unwrap();

        assert_ne!(hashing_thread, runtime_thread);
    }

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let (manager, _) = manager();
        manager
            .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
            .await
            .unwrap();
        let token = manager.authenticate("alice", "p1").await.unwrap();

        assert_ok!(manager.revoke(&token).await);
        assert_ok!(manager.revoke(&token).await);
        assert!(!manager.validate_token(&token).await.unwrap());
    }

    #[tokio::test]
    async fn test_revoke_garbage_is_invalid_token() {
        let (manager, _) = manager();

        let err = assert_err!(manager.revoke("not-a-token").await);
        assert_eq!(err, SessionError::InvalidToken);
    }

    #[tokio::test]
    async fn test_validate_requires_store_row() {
        let (manager, _) = manager();
        let signed_but_never_issued = TokenCodec::from_secret(SECRET, None)
            .mint(Uuid::new_v4())
            .unwrap();

        assert!(!manager.validate_token("not-a-token").await.unwrap());
        assert!(!manager
            .validate_token(&signed_but_never_issued)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_store_failures_propagate() {
        let (manager, store) = manager();
        manager
            .register(RegisterRequest::new("alice", "alice@x.com", "p1"))
            .await
            .unwrap();
        let token = manager.authenticate("alice", "p1").await.unwrap();

        store.set_offline(true);

        assert!(matches!(
            manager
                .register(RegisterRequest::new("bob", "bob@x.com", "p"))
                .await,
            Err(SessionError::Store(_))
        ));
        assert!(matches!(
            manager.authenticate("alice", "p1").await,
            Err(SessionError::Store(_))
        ));
        assert!(matches!(
            manager.revoke(&token).await,
            Err(SessionError::Store(_))
        ));
        assert!(matches!(
            manager.validate_token(&token).await,
            Err(SessionError::Store(_))
        ));
        // Garbage never reaches the store.
        assert_eq!(manager.validate_token("garbage").await, Ok(false));
    }
}
