//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, the authentication gate and the identity
//! extractor.

pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use extractors::AuthContext;
pub use handlers::AuthAppState;
pub use middleware::{AuthGateState, authenticate, bearer_token};
pub use router::{auth_route_security, auth_router};
