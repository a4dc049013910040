//! PostgreSQL-backed account and session store.

use super::{AccountStore, SessionStore};
use crate::config::SessionConfig;
use crate::error::{ConflictField, SessionError};
use crate::models::{Account, AccountCredential, NewAccount};

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

const USERNAME_CONSTRAINT: &str = "accounts_username_key";
const EMAIL_CONSTRAINT: &str = "accounts_email_key";

/// Relational store over a pooled PostgreSQL connection.
///
/// Every call checks a connection out of the pool for the length of one
/// statement; sqlx returns it on every exit path.
#[derive(Debug, Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Open a connection pool using the configured database URL
    pub async fn connect(config: &SessionConfig) -> Result<Self, SessionError> {
        let db = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(&config.database_url)
            .await?;

        Ok(Self::new(db))
    }

    /// Get reference to the database pool
    pub fn db(&self) -> &PgPool {
        &self.db
    }

    /// Create tables and constraints if they do not exist yet
    pub async fn migrate(&self) -> Result<(), SessionError> {
        tracing::info!("Running session store migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
                username VARCHAR(255) NOT NULL,
                email VARCHAR(255) NOT NULL,
                password_hash VARCHAR(255) NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                CONSTRAINT accounts_username_key UNIQUE (username),
                CONSTRAINT accounts_email_key UNIQUE (email)
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                account_id UUID NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
                token TEXT NOT NULL,
                issued_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (account_id, token)
            );
            "#,
        )
        .execute(&self.db)
        .await?;

        tracing::info!("Session store migrations completed successfully");
        Ok(())
    }
}

/// Map a violated unique constraint back to the account field it guards
fn conflict_field(constraint: Option<&str>) -> Option<ConflictField> {
    match constraint? {
        USERNAME_CONSTRAINT => Some(ConflictField::Username),
        EMAIL_CONSTRAINT => Some(ConflictField::Email),
        _ => None,
    }
}

fn unique_violation(err: &sqlx::Error) -> Option<ConflictField> {
    let db_err = err.as_database_error()?;
    if !db_err.is_unique_violation() {
        return None;
    }
    conflict_field(db_err.constraint())
}

#[async_trait]
impl AccountStore for PgStore {
    async fn exists_username(&self, username: &str) -> Result<bool, SessionError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.db)
                .await?;

        Ok(exists)
    }

    async fn exists_email(&self, email: &str) -> Result<bool, SessionError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.db)
                .await?;

        Ok(exists)
    }

    async fn insert_account(&self, account: NewAccount) -> Result<Account, SessionError> {
        let result = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .fetch_one(&self.db)
        .await;

        match result {
            Ok(account) => Ok(account),
            Err(err) => match unique_violation(&err) {
                Some(field) => {
                    tracing::warn!(field = %field, "Unique constraint rejected account insert");
                    Err(SessionError::Conflict(vec![field]))
                }
                None => Err(err.into()),
            },
        }
    }

    async fn find_credential_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountCredential>, SessionError> {
        let credential = sqlx::query_as::<_, AccountCredential>(
            "SELECT id AS account_id, password_hash FROM accounts WHERE username = $1 LIMIT 1",
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?;

        Ok(credential)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, account_id: Uuid, token: &str) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (account_id, token)
            VALUES ($1, $2)
            ON CONFLICT (account_id, token) DO NOTHING
            "#,
        )
        .bind(account_id)
        .bind(token)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn session_exists(&self, account_id: Uuid, token: &str) -> Result<bool, SessionError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM sessions WHERE account_id = $1 AND token = $2)",
        )
        .bind(account_id)
        .bind(token)
        .fetch_one(&self.db)
        .await?;

        Ok(exists)
    }

    async fn delete_session(&self, account_id: Uuid, token: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE account_id = $1 AND token = $2")
            .bind(account_id)
            .bind(token)
            .execute(&self.db)
            .await?;

        Ok(())
    }
}
