//! Auth Router

use axum::http::Method;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::application::token_service::JwtService;
use crate::domain::security::RouteSecurity;
use crate::presentation::handlers::{self, AuthAppState};

/// Token refresh and identity routes
pub fn auth_router(tokens: Arc<JwtService>) -> Router {
    let state = AuthAppState { tokens };

    Router::new()
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/me", get(handlers::me))
        .with_state(state)
}

/// Security requirements of the routes in [`auth_router`]
pub fn auth_route_security() -> RouteSecurity {
    RouteSecurity::new().bearer(Method::GET, "/me")
}
