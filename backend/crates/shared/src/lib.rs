//! Shared Kernel - Cross-crate minimal core
//!
//! This crate holds the vocabulary every service crate agrees on:
//! - The unified [`error::app_error::AppError`] type and result alias
//! - The [`error::kind::ErrorKind`] classification mapped onto HTTP statuses
//! - Conversion of axum extractor rejections
//!
//! **Design Principle**: Only include things whose meaning is identical
//! in every crate of the workspace.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
