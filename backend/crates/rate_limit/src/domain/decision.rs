//! Counter snapshots and limit decisions

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{RateLimitError, RateLimitResult};

/// What the counter store reports after one atomic increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Count after this increment (1 for a fresh bucket)
    pub count: i64,
    /// Seconds until the bucket expires
    pub ttl_secs: i64,
}

impl CounterSnapshot {
    pub fn new(count: i64, ttl_secs: i64) -> Self {
        Self { count, ttl_secs }
    }
}

/// Outcome of one limit check. Computed per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub current_count: u64,
    /// Requests left in this window, clamped at zero
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitDecision {
    /// Apply `max_requests` to a store snapshot.
    ///
    /// The request that brings the count to exactly `max_requests` is still
    /// allowed; the next one is not.
    pub fn from_snapshot(
        snapshot: CounterSnapshot,
        max_requests: u32,
        now: DateTime<Utc>,
    ) -> RateLimitResult<Self> {
        let current_count = u64::try_from(snapshot.count)
            .ok()
            .filter(|c| *c > 0)
            .ok_or_else(|| {
                RateLimitError::MalformedResult(format!("count = {}", snapshot.count))
            })?;

        if snapshot.ttl_secs < 0 {
            return Err(RateLimitError::MalformedResult(format!(
                "ttl = {}",
                snapshot.ttl_secs
            )));
        }

        let limit = u64::from(max_requests);

        Ok(Self {
            allowed: current_count <= limit,
            current_count,
            remaining: limit.saturating_sub(current_count),
            reset_at: now + TimeDelta::seconds(snapshot.ttl_secs),
        })
    }

    /// `reset_at` as unix seconds, for the `X-Ratelimit-Reset` header.
    #[inline]
    pub fn reset_unix(&self) -> i64 {
        self.reset_at.timestamp()
    }
}
