//! HTTP Handlers

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use kernel::error::app_error::AppError;
use std::sync::Arc;

use crate::application::token_service::JwtService;
use crate::error::AuthError;
use crate::presentation::dto::{MeResponse, RefreshRequest, RefreshResponse};
use crate::presentation::extractors::AuthContext;

/// Shared state for auth handlers
#[derive(Clone)]
pub struct AuthAppState {
    pub tokens: Arc<JwtService>,
}

// ============================================================================
// Token Refresh
// ============================================================================

/// POST /auth/refresh
pub async fn refresh_token(
    State(state): State<AuthAppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<RefreshResponse>, Response> {
    let Json(req) = payload.map_err(|e| AppError::from(e).into_response())?;

    if req.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refreshToken is required").into_response());
    }

    let access_token = state
        .tokens
        .refresh_access_token(&req.refresh_token)
        .map_err(|e| AuthError::from(e).into_response())?;

    Ok(Json(RefreshResponse { access_token }))
}

// ============================================================================
// Current Identity
// ============================================================================

/// GET /me
pub async fn me(auth: AuthContext) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: auth.user_id,
        email: auth.email,
        role: auth.role,
    })
}
