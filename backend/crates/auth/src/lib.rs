//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Claims, route security metadata, validator trait
//! - `application/` - Token service, configuration, rejection observers
//! - `presentation/` - Authentication gate, identity extractor, handlers, router
//!
//! ## Features
//! - HS256 access and refresh tokens sharing one claim shape
//! - Token refresh: validate the refresh token, issue a new access token
//! - Per-route bearer requirement resolved from the matched route template
//!
//! ## Security Model
//! - Issuer and audience are pinned; `exp` is required and `nbf` checked,
//!   with no clock leeway
//! - Every authentication failure yields the same 401 response; the reason
//!   is only logged and reported to the observer
//! - Authentication never fails open

pub mod application;
pub mod domain;
pub mod error;
pub mod presentation;

// Re-exports for convenience
pub use application::config::JwtConfig;
pub use application::observer::{AuthObserver, NoopAuthObserver, RejectReason};
pub use application::token_service::JwtService;
pub use domain::claims::Claims;
pub use domain::security::{RouteSecurity, SecurityRequirement};
pub use domain::validator::TokenValidator;
pub use error::{AuthError, AuthResult, TokenError};
pub use presentation::extractors::AuthContext;
pub use presentation::middleware::{AuthGateState, authenticate};
pub use presentation::router::{auth_route_security, auth_router};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
