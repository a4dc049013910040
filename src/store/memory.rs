//! In-memory account and session store.

use super::{AccountStore, SessionStore};
use crate::error::{ConflictField, SessionError};
use crate::models::{Account, AccountCredential, NewAccount, Session};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store with the same uniqueness rules as the relational
/// schema. Can be switched offline to make every call fail like a lost
/// database connection.
#[derive(Debug, Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
    sessions: RwLock<HashMap<(Uuid, String), DateTime<Utc>>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `SessionError::Store`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// All live sessions for an account, oldest first
    pub async fn sessions_for(&self, account_id: Uuid) -> Vec<Session> {
        let sessions = self.sessions.read().await;
        let mut found: Vec<Session> = sessions
            .iter()
            .filter(|((owner, _), _)| *owner == account_id)
            .map(|((owner, token), issued_at)| Session {
                account_id: *owner,
                token: token.clone(),
                issued_at: *issued_at,
            })
            .collect();
        found.sort_by_key(|s| s.issued_at);
        found
    }

    pub async fn account_count(&self) -> usize {
        self.accounts.read().await.len()
    }

    fn check_online(&self) -> Result<(), SessionError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(SessionError::Store("memory store is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn exists_username(&self, username: &str) -> Result<bool, SessionError> {
        self.check_online()?;
        let accounts = self.accounts.read().await;
        Ok(accounts.values().any(|a| a.username == username))
    }

    async fn exists_email(&self, email: &str) -> Result<bool, SessionError> {
        self.check_online()?;
        let accounts = self.accounts.read().await;
        Ok(accounts.values().any(|a| a.email == email))
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, SessionError> {
        self.check_online()?;
        let mut accounts = self.accounts.write().await;

        let mut conflicts = Vec::new();
        if accounts.values().any(|a| a.username == account.username) {
            conflicts.push(ConflictField::Username);
        }
        if accounts.values().any(|a| a.email == account.email) {
            conflicts.push(ConflictField::Email);
        }
        if !conflicts.is_empty() {
            return Err(SessionError::Conflict(conflicts));
        }

        let stored = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            created_at: Utc::now(),
        };
        accounts.insert(stored.id, stored.clone());

        Ok(stored)
    }

    async fn find_credential_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountCredential>, SessionError> {
        self.check_online()?;
        let accounts = self.accounts.read().await;

        Ok(accounts
            .values()
            .find(|a| a.username == username)
            .map(|a| AccountCredential {
                account_id: a.id,
                password_hash: a.password_hash.clone(),
            }))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, account_id: Uuid, token: &str) -> Result<(), SessionError> {
        self.check_online()?;
        // Mirrors the foreign key on sessions.account_id
        if !self.accounts.read().await.contains_key(&account_id) {
            return Err(SessionError::Store(format!(
                "session references unknown account {account_id}"
            )));
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry((account_id, token.to_string()))
            .or_insert_with(Utc::now);
        Ok(())
    }

    async fn session_exists(&self, account_id: Uuid, token: &str) -> Result<bool, SessionError> {
        self.check_online()?;
        let sessions = self.sessions.read().await;
        Ok(sessions.contains_key(&(account_id, token.to_string())))
    }

    async fn delete_session(&self, account_id: Uuid, token: &str) -> Result<(), SessionError> {
        self.check_online()?;
        let mut sessions = self.sessions.write().await;
        sessions.remove(&(account_id, token.to_string()));
        Ok(())
    }
}
