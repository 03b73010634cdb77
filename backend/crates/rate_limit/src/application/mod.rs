//! Application Layer
//!
//! The limit evaluator and the hooks it reports decisions into.

pub mod evaluator;
pub mod observer;

// Re-exports
pub use evaluator::RateLimitEvaluator;
pub use observer::{NoopObserver, Outcome, RateLimitObserver};
