//! Session Manager
//!
//! Account registration and session-token service providing:
//! - Account registration with unique usernames and emails
//! - Argon2id password hashing
//! - HS512-signed bearer tokens
//! - Store-backed token revocation and validation
//!
//! A token is only valid while its row exists in the session store; a good
//! signature on its own is not enough. Tokens carry no expiry unless
//! `TOKEN_TTL_SECONDS` is set.
//!
//! # Configuration
//!
//! All configuration is loaded from environment variables:
//! - `DATABASE_URL` - PostgreSQL connection string (required)
//! - `JWT_SECRET` - Secret key for signing tokens (required, min 32 chars)
//! - `TOKEN_TTL_SECONDS` - Token lifetime in seconds (default: unset, no expiry)
//! - `ARGON2_MEMORY_COST` / `ARGON2_TIME_COST` / `ARGON2_PARALLELISM` - hashing cost
//! - `DATABASE_MAX_CONNECTIONS` - pool size (default: 10)
//! - `BIND_ADDR` - HTTP listen address (default: 127.0.0.1:3000)
//!
//! # Usage
//!
//! ```rust,ignore
//! use session_manager::{PgStore, RegisterRequest, SessionConfig, SessionManager};
//! use std::sync::Arc;
//!
//! let config = SessionConfig::from_env()?;
//! config.validate()?;
//!
//! let store = Arc::new(PgStore::connect(&config).await?);
//! store.migrate().await?;
//!
//! let manager = SessionManager::with_store(&config, store)?;
//! manager.register(RegisterRequest::new("alice", "alice@x.com", "p1")).await?;
//! let token = manager.authenticate("alice", "p1").await?;
//! assert!(manager.validate_token(&token).await?);
//! ```

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod password;
pub mod service;
pub mod store;
pub mod token;

// Re-export commonly used types
pub use config::SessionConfig;
pub use error::{ConflictField, SessionError};
pub use extractors::BearerToken;
pub use handlers::{create_routes, SessionState};
pub use models::*;
pub use password::{CredentialHasher, PasswordMismatch};
pub use service::SessionManager;
pub use store::{AccountStore, MemoryStore, PgStore, SessionStore};
pub use token::TokenCodec;
