//! Credential hashing with Argon2id.

use crate::config::SessionConfig;
use crate::error::SessionError;

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as PasswordHashError, PasswordHash, PasswordHasher,
        PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use rand::{distributions::Alphanumeric, Rng};

/// Why a password failed verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PasswordMismatch {
    #[error("Password does not match")]
    WrongPassword,

    #[error("Stored password hash is malformed")]
    MalformedHash,
}

/// One-way password hasher
///
/// Produces PHC strings (`$argon2id$v=19$m=..,t=..,p=..$salt$hash`) with a
/// fresh random salt per call. Verification reads the cost parameters back
/// out of the stored string, so hashes made under older settings still
/// verify after the configuration changes.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl CredentialHasher {
    /// Create a hasher with the Argon2 cost parameters from config
    pub fn new(config: &SessionConfig) -> Result<Self, SessionError> {
        Self::with_params(
            config.argon2_memory_cost,
            config.argon2_time_cost,
            config.argon2_parallelism,
        )
    }

    pub fn with_params(
        memory_cost: u32,
        time_cost: u32,
        parallelism: u32,
    ) -> Result<Self, SessionError> {
        let params = Params::new(memory_cost, time_cost, parallelism, None)
            .map_err(|e| SessionError::Config(format!("Invalid Argon2 parameters: {e}")))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        // Stand-in hash for unknown usernames, same cost as real ones.
        let filler: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let salt = SaltString::generate(&mut OsRng);
        let dummy_hash = argon2
            .hash_password(filler.as_bytes(), &salt)?
            .to_string();

        Ok(Self { argon2, dummy_hash })
    }

    /// Hash a password
    pub fn hash(&self, password: &str) -> Result<String, SessionError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)?
            .to_string();

        Ok(hash)
    }

    /// Verify a password against a stored hash
    pub fn verify(&self, hash: &str, password: &str) -> Result<(), PasswordMismatch> {
        let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordMismatch::MalformedHash)?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(()),
            Err(PasswordHashError::Password) => Err(PasswordMismatch::WrongPassword),
            Err(_) => Err(PasswordMismatch::MalformedHash),
        }
    }

    /// Burn one verification against the stand-in hash.
    ///
    /// Called when no account matched so that an unknown username costs the
    /// same as a wrong password.
    pub fn verify_dummy(&self, password: &str) {
        let _ = self.verify(&self.dummy_hash, password);
    }
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("params", self.argon2.params())
            .finish_non_exhaustive()
    }
}
