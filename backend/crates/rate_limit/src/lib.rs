//! Distributed Rate Limiting
//!
//! Clean Architecture structure:
//! - `domain/` - Scopes, bucket keys, decisions, counter store trait
//! - `application/` - The limit evaluator and decision observers
//! - `infra/` - Redis, PostgreSQL and in-process counter stores
//! - `presentation/` - axum middleware
//!
//! ## Model
//! - Fixed window counting: a bucket is created with a TTL equal to the
//!   window and disappears when the TTL runs out
//! - All counting state lives in the counter store, so every instance of the
//!   service shares the same buckets
//! - Create-or-increment-and-read is one atomic store operation; nothing here
//!   reads a count and writes it back in two steps
//! - Store failures never block traffic: the middleware fails open

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::evaluator::RateLimitEvaluator;
pub use application::observer::{NoopObserver, Outcome, RateLimitObserver};
pub use domain::decision::{CounterSnapshot, RateLimitDecision};
pub use domain::key::{RateLimitKey, derive_key};
pub use domain::repository::CounterStore;
pub use domain::scope::RateLimitScope;
pub use error::{RateLimitError, RateLimitResult};
pub use infra::memory::MemoryCounterStore;
pub use infra::postgres::PgCounterStore;
pub use infra::redis::RedisCounterStore;
pub use platform::rate_limit::RateLimitPolicy;
pub use presentation::middleware::{RateLimitState, enforce_rate_limit};
