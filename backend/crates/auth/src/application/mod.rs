//! Application Layer
//!
//! Token issuance and validation, and the rejection observer hook.

pub mod config;
pub mod observer;
pub mod token_service;

// Re-exports
pub use config::JwtConfig;
pub use observer::{AuthObserver, NoopAuthObserver, RejectReason};
pub use token_service::JwtService;
