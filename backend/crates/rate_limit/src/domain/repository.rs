//! Counter Store Trait
//!
//! Interface for the shared counter backend. Implementations are in the
//! infrastructure layer.

use std::time::Duration;

use crate::domain::decision::CounterSnapshot;
use crate::error::RateLimitResult;

/// Atomic increment-with-expiry store
#[trait_variant::make(CounterStore: Send)]
pub trait LocalCounterStore {
    /// Create-or-increment `key` and read it back, as one indivisible step.
    ///
    /// An absent key is created with count 1 and a time-to-live of `ttl`.
    /// An existing key is incremented and keeps its remaining time-to-live.
    /// Concurrent callers sharing a key must each observe a distinct count.
    async fn increment(&self, key: &str, ttl: Duration) -> RateLimitResult<CounterSnapshot>;
}
