//! Token validator seam
//!
//! The authentication gate only needs "token in, claims or failure out".
//! [`crate::application::token_service::JwtService`] is the production
//! implementation.

use crate::domain::claims::Claims;
use crate::error::TokenError;

pub trait TokenValidator: Send + Sync {
    /// Verify signature, expiry and structure of `token`.
    fn validate(&self, token: &str) -> Result<Claims, TokenError>;
}
