//! In-process counter store
//!
//! Buckets live in one map behind one mutex, so create-or-increment-and-read
//! happens inside a single critical section. Limits are only shared within
//! this process; use it for tests and single-instance deployments.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::domain::decision::CounterSnapshot;
use crate::domain::repository::CounterStore;
use crate::error::RateLimitResult;

/// Expired buckets are swept once the map grows past this size.
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: i64,
    expires_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryCounterStore {
    buckets: Arc<Mutex<HashMap<String, Bucket>>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live and expired-but-unswept buckets.
    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.buckets.lock().await.len()
    }
}

impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> RateLimitResult<CounterSnapshot> {
        let now = Instant::now();
        let mut buckets = self.buckets.lock().await;

        if buckets.len() >= SWEEP_THRESHOLD {
            buckets.retain(|_, b| b.expires_at > now);
        }

        let bucket = match buckets.get_mut(key) {
            Some(bucket) if bucket.expires_at > now => {
                bucket.count += 1;
                *bucket
            }
            _ => {
                let bucket = Bucket {
                    count: 1,
                    expires_at: now + ttl,
                };
                buckets.insert(key.to_string(), bucket);
                bucket
            }
        };

        Ok(CounterSnapshot::new(
            bucket.count,
            rounded_secs(bucket.expires_at - now),
        ))
    }
}

/// Whole seconds, rounded to nearest like Redis `TTL`.
fn rounded_secs(remaining: Duration) -> i64 {
    ((remaining.as_millis() + 500) / 1000) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_first_increment_creates_bucket() {
        let store = MemoryCounterStore::new();
        let snapshot = store
            .increment("rate_limit:global", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(snapshot, CounterSnapshot::new(1, 60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_increment_keeps_original_expiry() {
        let store = MemoryCounterStore::new();
        let ttl = Duration::from_secs(60);

        store.increment("k", ttl).await.unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;
        let snapshot = store.increment("k", ttl).await.unwrap();

        assert_eq!(snapshot, CounterSnapshot::new(2, 40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_bucket_restarts_at_one() {
        let store = MemoryCounterStore::new();
        let ttl = Duration::from_secs(10);

        for _ in 0..3 {
            store.increment("k", ttl).await.unwrap();
        }
        tokio::time::advance(Duration::from_secs(11)).await;

        let snapshot = store.increment("k", ttl).await.unwrap();
        assert_eq!(snapshot, CounterSnapshot::new(1, 10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_buckets_are_swept_past_threshold() {
        let store = MemoryCounterStore::new();
        for n in 0..SWEEP_THRESHOLD {
            store
                .increment(&format!("short:{n}"), Duration::from_secs(1))
                .await
                .unwrap();
        }
        store.increment("long", Duration::from_secs(60)).await.unwrap();
        assert_eq!(store.len().await, SWEEP_THRESHOLD + 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        store.increment("fresh", Duration::from_secs(60)).await.unwrap();

        assert_eq!(store.len().await, 2);
    }

    #[test]
    fn test_rounded_secs() {
        assert_eq!(rounded_secs(Duration::from_millis(59_499)), 59);
        assert_eq!(rounded_secs(Duration::from_millis(59_500)), 60);
        assert_eq!(rounded_secs(Duration::ZERO), 0);
    }
}
