//! Token Codec
//!
//! Signs an account id into an HS512 JWT and reads it back out. Signature
//! validity is necessary but not sufficient: callers still have to find
//! the token in the session store before trusting it.

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::models::TokenClaims;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// Mints and verifies signed session tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_seconds: Option<i64>,
}

impl TokenCodec {
    /// Create a codec from the configured secret and optional lifetime
    pub fn new(config: &SessionConfig) -> Self {
        Self::from_secret(config.jwt_secret.as_bytes(), config.token_ttl)
    }

    pub fn from_secret(secret: &[u8], ttl_seconds: Option<i64>) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.required_spec_claims.clear();
        match ttl_seconds {
            Some(_) => validation.set_required_spec_claims(&["exp"]),
            None => validation.validate_exp = false,
        }

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_seconds,
        }
    }

    /// Produce a signed token carrying `account_id`
    pub fn mint(&self, account_id: Uuid) -> Result<String, SessionError> {
        let now = Utc::now();
        let exp = match self.ttl_seconds {
            Some(ttl) => Some(
                Duration::try_seconds(ttl)
                    .and_then(|ttl| now.checked_add_signed(ttl))
                    .ok_or_else(|| {
                        tracing::error!(ttl_seconds = ttl, "Token expiry out of range");
                        SessionError::Internal
                    })?
                    .timestamp(),
            ),
            None => None,
        };
        let claims = TokenClaims {
            sub: account_id,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp,
        };

        encode(&Header::new(ALGORITHM), &claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Token signing failed: {:?}", e);
            SessionError::Internal
        })
    }

    /// Verify a token and return the account id it was minted for.
    ///
    /// Any failure, including a header naming a different algorithm, comes
    /// back as `InvalidToken`.
    pub fn extract(&self, token: &str) -> Result<Uuid, SessionError> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;

        Ok(token_data.claims.sub)
    }
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &ALGORITHM)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}
