//! Auth Error Types
//!
//! This module provides auth-specific error variants that integrate
//! with the unified `kernel::error::AppError` system.
//!
//! Every rejection renders the same 401 response. The variant only shows up
//! in logs and metrics.

use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::application::observer::RejectReason;

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Body detail of every 401 response.
pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";

/// Token issuance and validation failures
#[derive(Debug, Error)]
pub enum TokenError {
    /// `exp` is in the past
    #[error("Token has expired")]
    Expired,

    /// Bad signature, wrong issuer or audience, malformed structure
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Encoding failed while issuing a token
    #[error("Failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(err.to_string()),
        }
    }
}

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `Authorization` header
    #[error("Authorization header is missing")]
    MissingHeader,

    /// `Authorization` header does not use the `Bearer` scheme
    #[error("Authorization header is not a bearer credential")]
    InvalidScheme,

    /// `Bearer` with nothing after it
    #[error("Bearer token is empty")]
    EmptyToken,

    /// Token present but rejected by the validator
    #[error(transparent)]
    Token(#[from] TokenError),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Reason label for logs and metrics.
    pub fn reason(&self) -> RejectReason {
        match self {
            AuthError::MissingHeader => RejectReason::MissingHeader,
            AuthError::InvalidScheme => RejectReason::InvalidScheme,
            AuthError::EmptyToken => RejectReason::EmptyToken,
            AuthError::Token(TokenError::Expired) => RejectReason::Expired,
            AuthError::Token(_) | AuthError::Internal(_) => RejectReason::Invalid,
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Token(TokenError::Signing(_)) | AuthError::Internal(_) => {
                ErrorKind::InternalServerError
            }
            _ => ErrorKind::Unauthorized,
        }
    }

    /// Convert to AppError
    ///
    /// Client errors collapse to one message so the response never tells an
    /// expired token apart from a forged one.
    pub fn to_app_error(&self) -> AppError {
        match self.kind() {
            ErrorKind::Unauthorized => AppError::unauthorized(UNAUTHORIZED_MESSAGE),
            kind => AppError::new(kind, "Internal server error"),
        }
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        match self {
            AuthError::Token(TokenError::Signing(e)) => {
                tracing::error!(error = %e, "Token signing failed");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            _ => {
                tracing::debug!(reason = %self.reason(), error = %self, "Authentication rejected");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();

        let unauthorized = self.kind() == ErrorKind::Unauthorized;
        let mut response = self.to_app_error().into_response();
        if unauthorized {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        AuthError::Internal(err.to_string())
    }
}
