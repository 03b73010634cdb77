//! Redis counter store
//!
//! The whole create-or-increment-and-read runs as one Lua script, which Redis
//! executes without interleaving other commands.

use redis::Script;
use redis::aio::ConnectionManager;
use std::time::Duration;

use crate::domain::decision::CounterSnapshot;
use crate::domain::repository::CounterStore;
use crate::error::{RateLimitError, RateLimitResult};

/// KEYS[1] = bucket key, ARGV[1] = window seconds.
/// Returns `{count, ttl_seconds}`.
const INCREMENT_SCRIPT: &str = r"
local key = KEYS[1]
local window = tonumber(ARGV[1])

local current = redis.call('GET', key)
if current == false then
    redis.call('SET', key, 1, 'EX', window)
    return {1, window}
end

local count = redis.call('INCR', key)
local ttl = redis.call('TTL', key)
if ttl < 0 then
    redis.call('EXPIRE', key, window)
    ttl = window
end

return {count, ttl}
";

#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    script: Script,
}

impl RedisCounterStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            script: Script::new(INCREMENT_SCRIPT),
        }
    }

    /// Open a managed connection to `url` (`redis://host:port/db`).
    pub async fn connect(url: &str) -> RateLimitResult<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::debug!("Connected to Redis for rate limiting");
        Ok(Self::new(conn))
    }

    pub fn connection(&self) -> ConnectionManager {
        self.conn.clone()
    }
}

impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> RateLimitResult<CounterSnapshot> {
        let mut conn = self.conn.clone();

        let values: Vec<i64> = self
            .script
            .key(key)
            .arg(ttl.as_secs().max(1))
            .invoke_async(&mut conn)
            .await
            .map_err(|e| match e.kind() {
                redis::ErrorKind::TypeError => RateLimitError::MalformedResult(e.to_string()),
                _ => RateLimitError::Redis(e),
            })?;

        match values.as_slice() {
            [count, ttl_secs] => Ok(CounterSnapshot::new(*count, *ttl_secs)),
            other => Err(RateLimitError::MalformedResult(format!("{other:?}"))),
        }
    }
}

impl std::fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}
