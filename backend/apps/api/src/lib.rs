//! API service library
//!
//! The binary in `main.rs` only connects dependencies and serves; everything
//! that shapes a request lives here so integration tests can drive the real
//! router.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod server;

pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
