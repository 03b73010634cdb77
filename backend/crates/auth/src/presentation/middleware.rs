//! Auth Middleware
//!
//! The authentication gate. Routes are looked up by method and matched route
//! template in the [`RouteSecurity`] table:
//!
//! - no bearer requirement: the request passes untouched
//! - requirement: `Authorization: Bearer <token>` must carry a valid token,
//!   otherwise 401 and the handler never runs
//! - valid token: an [`AuthContext`] is stored in the request extensions

use axum::body::Body;
use axum::extract::{MatchedPath, State};
use axum::http::{HeaderMap, Request, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::application::observer::{AuthObserver, NoopAuthObserver};
use crate::domain::security::RouteSecurity;
use crate::domain::validator::TokenValidator;
use crate::error::{AuthError, AuthResult};
use crate::presentation::extractors::AuthContext;

const BEARER_PREFIX: &str = "Bearer ";

/// Middleware state
#[derive(Clone)]
pub struct AuthGateState {
    pub validator: Arc<dyn TokenValidator>,
    pub security: Arc<RouteSecurity>,
    pub observer: Arc<dyn AuthObserver>,
}

impl AuthGateState {
    pub fn new(validator: Arc<dyn TokenValidator>, security: RouteSecurity) -> Self {
        Self {
            validator,
            security: Arc::new(security),
            observer: Arc::new(NoopAuthObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn AuthObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// Middleware that enforces bearer authentication where the route asks for it
pub async fn authenticate(
    State(state): State<AuthGateState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let requires_bearer = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| {
            state
                .security
                .requirement(req.method(), path.as_str())
                .requires_bearer()
        })
        .unwrap_or(false);

    if !requires_bearer {
        return next.run(req).await;
    }

    let claims = bearer_token(req.headers()).and_then(|token| {
        state
            .validator
            .validate(token)
            .map_err(AuthError::from)
    });

    match claims {
        Ok(claims) => {
            tracing::debug!(user_id = %claims.user_id, "Request authenticated");
            req.extensions_mut().insert(AuthContext::from(claims));
            next.run(req).await
        }
        Err(e) => {
            state.observer.on_rejection(e.reason());
            e.into_response()
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-sensitively.
pub fn bearer_token(headers: &HeaderMap) -> AuthResult<&str> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;

    let token = value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(AuthError::InvalidScheme)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }

    Ok(token)
}
