//! Persistence contracts for accounts and issued session tokens.
//!
//! The session manager only talks to these traits. `PgStore` backs them
//! with PostgreSQL; `MemoryStore` keeps everything in process for tests
//! and local runs.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::SessionError;
use crate::models::{Account, AccountCredential, NewAccount};

use async_trait::async_trait;
use uuid::Uuid;

/// Durable table of accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// True iff an account with exactly this username exists
    async fn exists_username(&self, username: &str) -> Result<bool, SessionError>;

    /// True iff an account with exactly this email exists
    async fn exists_email(&self, email: &str) -> Result<bool, SessionError>;

    /// Persist a new account with a store-generated id.
    ///
    /// A uniqueness violation comes back as `SessionError::Conflict` naming
    /// the field, never as `SessionError::Store`.
    async fn insert_account(&self, account: NewAccount) -> Result<Account, SessionError>;

    /// Look up the id and password hash for a username.
    ///
    /// `Ok(None)` when nothing matches; `Err` only for store failures.
    async fn find_credential_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountCredential>, SessionError>;
}

/// Durable table of issued tokens per account
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a session row. Not idempotent: check `session_exists` first.
    async fn insert_session(&self, account_id: Uuid, token: &str) -> Result<(), SessionError>;

    async fn session_exists(&self, account_id: Uuid, token: &str) -> Result<bool, SessionError>;

    /// Remove a session row. Removing a row that is not there succeeds.
    async fn delete_session(&self, account_id: Uuid, token: &str) -> Result<(), SessionError>;
}
