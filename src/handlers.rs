//! Session HTTP Handlers
//!
//! REST endpoints over the session manager. Each handler is a thin
//! adapter: decode the request, call one operation, map the outcome.

use crate::error::SessionError;
use crate::extractors::BearerToken;
use crate::models::*;
use crate::service::SessionManager;

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared session manager state
pub type SessionState = Arc<SessionManager>;

// ============================================
// Route Builder
// ============================================

/// Create session routes
pub fn create_routes(manager: Arc<SessionManager>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/token/validate", post(validate_token))
        .layer(TraceLayer::new_for_http())
        .with_state(manager)
}

// ============================================
// Handlers
// ============================================

/// POST /register
pub async fn register(
    State(manager): State<SessionState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, SessionError> {
    let account = manager.register(req).await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// POST /login
pub async fn login(
    State(manager): State<SessionState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, SessionError> {
    let token = manager.authenticate(&req.username, &req.password).await?;

    Ok(Json(TokenResponse::bearer(token)))
}

/// POST /logout
pub async fn logout(
    State(manager): State<SessionState>,
    token: BearerToken,
) -> Result<impl IntoResponse, SessionError> {
    manager.revoke(token.as_str()).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /token/validate
///
/// 204 when the token is live, 404 otherwise.
pub async fn validate_token(
    State(manager): State<SessionState>,
    token: BearerToken,
) -> Result<impl IntoResponse, SessionError> {
    if manager.validate_token(token.as_str()).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}
