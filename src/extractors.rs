//! Session Extractors
//!
//! Axum extractors for pulling the session token out of a request.

use crate::error::SessionError;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Raw session token taken from the `Authorization` header.
///
/// Accepts both `Bearer <token>` and a bare token value.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl BearerToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let token = match header.split_once(' ') {
            Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
            _ if header.eq_ignore_ascii_case("bearer") => "",
            _ => header,
        };

        if token.is_empty() {
            None
        } else {
            Some(BearerToken(token.to_string()))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = SessionError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(BearerToken::parse)
            .ok_or(SessionError::InvalidToken)
    }
}
