//! Domain Layer
//!
//! This layer contains:
//! - Limiting scopes and their bucket keys
//! - Counter snapshots and limit decisions
//! - The counter store trait (implemented in `infra/`)

pub mod decision;
pub mod key;
pub mod repository;
pub mod scope;
