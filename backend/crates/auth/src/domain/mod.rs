//! Domain Layer
//!
//! Token claims, per-route security requirements and the validator seam the
//! authentication gate depends on.

pub mod claims;
pub mod security;
pub mod validator;

pub use claims::Claims;
pub use security::{RouteSecurity, SecurityRequirement};
pub use validator::TokenValidator;
