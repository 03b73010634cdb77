//! JWT claims

use serde::{Deserialize, Serialize};

/// Claim set carried by both access and refresh tokens.
///
/// The identity fields sit beside the registered claims; `sub` repeats
/// `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    pub role: String,

    pub iss: String,
    pub sub: String,
    pub aud: Vec<String>,
    /// Expiry, unix seconds
    pub exp: i64,
    /// Not valid before, unix seconds
    pub nbf: i64,
    /// Issued at, unix seconds
    pub iat: i64,
}
