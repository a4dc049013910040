//! Session Configuration
//!
//! All configuration values are loaded from environment variables once at
//! startup and handed to the session manager by reference.

use crate::error::SessionError;
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

/// Longest accepted token lifetime: ten years
pub const MAX_TOKEN_TTL_SECONDS: i64 = 10 * 365 * 24 * 60 * 60;

/// Session service configuration loaded from environment
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// PostgreSQL connection string (from DATABASE_URL env var)
    pub database_url: String,

    /// Maximum pooled database connections (from DATABASE_MAX_CONNECTIONS env var)
    pub db_max_connections: u32,

    /// Secret key for signing tokens (from JWT_SECRET env var)
    pub jwt_secret: String,

    /// Token lifetime in seconds (from TOKEN_TTL_SECONDS env var).
    /// `None` means tokens stay valid until revoked.
    pub token_ttl: Option<i64>,

    /// Argon2 memory cost in KiB (from ARGON2_MEMORY_COST env var)
    pub argon2_memory_cost: u32,

    /// Argon2 time cost (iterations) (from ARGON2_TIME_COST env var)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (from ARGON2_PARALLELISM env var)
    pub argon2_parallelism: u32,

    /// HTTP listen address (from BIND_ADDR env var)
    pub bind_addr: SocketAddr,
}

impl SessionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, SessionError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SessionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> Result<String, SessionError> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| SessionError::Config(format!("{key} must be set")))
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            db_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
            jwt_secret: required("JWT_SECRET")?,
            token_ttl: parse_optional(&lookup, "TOKEN_TTL_SECONDS")?,
            argon2_memory_cost: parse_or(&lookup, "ARGON2_MEMORY_COST", 65536)?, // 64 MiB
            argon2_time_cost: parse_or(&lookup, "ARGON2_TIME_COST", 3)?,
            argon2_parallelism: parse_or(&lookup, "ARGON2_PARALLELISM", 4)?,
            bind_addr: parse_or(
                &lookup,
                "BIND_ADDR",
                SocketAddr::from(([127, 0, 0, 1], 3000)),
            )?,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.jwt_secret.len() < 32 {
            return Err(SessionError::Config(
                "JWT_SECRET must be at least 32 characters".to_string(),
            ));
        }

        if matches!(self.token_ttl, Some(ttl) if ttl <= 0) {
            return Err(SessionError::Config(
                "TOKEN_TTL_SECONDS must be positive".to_string(),
            ));
        }

        if matches!(self.token_ttl, Some(ttl) if ttl > MAX_TOKEN_TTL_SECONDS) {
            return Err(SessionError::Config(format!(
                "TOKEN_TTL_SECONDS must be at most {MAX_TOKEN_TTL_SECONDS}"
            )));
        }

        if self.db_max_connections == 0 {
            return Err(SessionError::Config(
                "DATABASE_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        argon2::Params::new(
            self.argon2_memory_cost,
            self.argon2_time_cost,
            self.argon2_parallelism,
            None,
        )
        .map_err(|e| SessionError::Config(format!("Invalid Argon2 parameters: {e}")))?;

        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, SessionError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn parse_optional<F, T>(lookup: &F, key: &str) -> Result<Option<T>, SessionError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| SessionError::Config(format!("{key} has an invalid value: {raw}"))),
    }
}
