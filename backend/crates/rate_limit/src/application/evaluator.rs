//! Rate Limit Evaluator
//!
//! Runs one atomic store operation per check and turns the snapshot into a
//! decision.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::decision::RateLimitDecision;
use crate::domain::key::RateLimitKey;
use crate::domain::repository::CounterStore;
use crate::error::{RateLimitError, RateLimitResult};

/// Default deadline for one store round trip.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

pub struct RateLimitEvaluator<S>
where
    S: CounterStore + Send + Sync + 'static,
{
    store: Arc<S>,
    store_timeout: Duration,
}

impl<S> RateLimitEvaluator<S>
where
    S: CounterStore + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, store_timeout: Duration) -> Self {
        self.store_timeout = store_timeout;
        self
    }

    /// Count one request against `key` and decide whether it may proceed.
    ///
    /// The store call is bounded by the configured timeout; dropping the
    /// returned future abandons the call.
    pub async fn check_limit(
        &self,
        key: &RateLimitKey,
        max_requests: u32,
        window: Duration,
    ) -> RateLimitResult<RateLimitDecision> {
        let ttl = Duration::from_secs(window.as_secs().max(1));

        let snapshot = tokio::time::timeout(
            self.store_timeout,
            self.store.increment(key.as_str(), ttl),
        )
        .await
        .map_err(|_| RateLimitError::Timeout(self.store_timeout))??;

        RateLimitDecision::from_snapshot(snapshot, max_requests, Utc::now())
    }
}

impl<S> Clone for RateLimitEvaluator<S>
where
    S: CounterStore + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            store_timeout: self.store_timeout,
        }
    }
}
