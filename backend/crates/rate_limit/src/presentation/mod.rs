//! Presentation Layer
//!
//! axum middleware that runs one limiter stage.

pub mod middleware;

pub use middleware::{RateLimitState, enforce_rate_limit};
