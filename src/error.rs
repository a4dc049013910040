//! Session Error Types
//!
//! The closed set of outcomes every session operation can return, plus
//! their mapping onto HTTP responses for the boundary layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Account field that collided with an existing account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictField {
    Username,
    Email,
}

impl ConflictField {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConflictField::Username => "username",
            ConflictField::Email => "email",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ConflictField::Username => "An account already exists with this username",
            ConflictField::Email => "An account already exists with this email",
        }
    }
}

impl std::fmt::Display for ConflictField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Session errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("One or more fields already exist: {}", join_fields(.0))]
    Conflict(Vec<ConflictField>),

    #[error("Incorrect user or password")]
    NotFound,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Store error: {0}")]
    Store(String),

    #[error("Password hashing failed")]
    Hashing,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error")]
    Internal,
}

fn join_fields(fields: &[ConflictField]) -> String {
    fields
        .iter()
        .map(ConflictField::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl SessionError {
    /// Machine-readable error code used in response bodies
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::Validation(_) => "validation_error",
            SessionError::Conflict(_) => "fields_repeated",
            SessionError::NotFound => "not_found",
            SessionError::InvalidToken => "invalid_token",
            SessionError::Config(_) => "configuration_error",
            SessionError::Store(_) | SessionError::Hashing | SessionError::Internal => {
                "internal_error"
            }
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::Validation(_) => StatusCode::BAD_REQUEST,
            SessionError::Conflict(_) => StatusCode::CONFLICT,
            SessionError::NotFound => StatusCode::NOT_FOUND,
            SessionError::InvalidToken => StatusCode::UNAUTHORIZED,
            SessionError::Store(_)
            | SessionError::Hashing
            | SessionError::Config(_)
            | SessionError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for SessionError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            SessionError::Conflict(fields) => {
                let fields: serde_json::Map<String, serde_json::Value> = fields
                    .iter()
                    .map(|f| (f.as_str().to_string(), f.message().into()))
                    .collect();

                serde_json::json!({
                    "error": self.code(),
                    "message": "One or more fields already exist",
                    "fields": fields
                })
            }
            SessionError::Validation(msg) => serde_json::json!({
                "error": self.code(),
                "message": msg
            }),
            SessionError::NotFound | SessionError::InvalidToken => serde_json::json!({
                "error": self.code(),
                "message": self.to_string()
            }),
            SessionError::Store(_)
            | SessionError::Hashing
            | SessionError::Config(_)
            | SessionError::Internal => serde_json::json!({
                "error": self.code(),
                "message": "An internal error occurred"
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for SessionError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        SessionError::Store(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for SessionError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        SessionError::Hashing
    }
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("Token rejected: {:?}", err);
        SessionError::InvalidToken
    }
}
