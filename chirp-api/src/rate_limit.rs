//! Sliding-window admission control for post submission, keyed by the
//! authenticated caller. The production backend is a shared Redis counter so
//! the limit holds across all instances of the service.

use async_trait::async_trait;
use chirp_common::snowflake::{ProcessId, WorkerId};
use redis::aio::ConnectionManager;
use redis::Script;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::time::timeout;
use tracing::debug;

const BACKEND_TIMEOUT: Duration = Duration::from_millis(500);

/// Window policy, decoupled from the backing mechanism.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self {
            max_requests: 3,
            window: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Rate limit backend could not be reached: {0}")]
    Backend(#[from] redis::RedisError),
    #[error("Rate limit backend timed out after {0:?}")]
    Timeout(Duration),
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// `false` denies the acquisition; the caller rejects the request and does
    /// not retry here. Backoff is the caller's concern.
    async fn try_acquire(&self, key: &str) -> Result<bool, RateLimitError>;
}

/// One round trip: prune entries older than the window, admit only while the
/// set holds fewer than the limit. Running as a single script closes the race
/// where two concurrent checks both observe a free slot.
const SLIDING_WINDOW_SCRIPT: &str = r"
local key = KEYS[1]
local now_ms = tonumber(ARGV[1])
local window_ms = tonumber(ARGV[2])
local max_requests = tonumber(ARGV[3])
local member = ARGV[4]

redis.call('ZREMRANGEBYSCORE', key, 0, now_ms - window_ms)
if redis.call('ZCARD', key) < max_requests then
    redis.call('ZADD', key, now_ms, member)
    redis.call('PEXPIRE', key, window_ms)
    return 1
end
return 0
";

/// Members must be unique across every instance writing to the same key, or
/// concurrent ZADDs collapse into one entry and the window under-counts. The
/// worker and process ids disambiguate instances, the sequence disambiguates
/// acquisitions within one millisecond.
fn window_member(worker_id: WorkerId, process_id: ProcessId, now_ms: u64, sequence: u64) -> String {
    format!(
        "{}-{}-{now_ms}-{sequence}",
        worker_id.get(),
        process_id.get()
    )
}

pub struct RedisRateLimiter {
    connection: ConnectionManager,
    script: Script,
    policy: RateLimitPolicy,
    worker_id: WorkerId,
    process_id: ProcessId,
    sequence: AtomicU64,
}

impl RedisRateLimiter {
    pub async fn connect(
        redis_url: &str,
        policy: RateLimitPolicy,
        worker_id: WorkerId,
        process_id: ProcessId,
    ) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(redis_url)?;
        let connection = ConnectionManager::new(client).await?;

        Ok(Self {
            connection,
            script: Script::new(SLIDING_WINDOW_SCRIPT),
            policy,
            worker_id,
            process_id,
            sequence: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn try_acquire(&self, key: &str) -> Result<bool, RateLimitError> {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
        let window_ms = u64::try_from(self.policy.window.as_millis()).unwrap_or(u64::MAX);
        let member = window_member(
            self.worker_id,
            self.process_id,
            now_ms,
            self.sequence.fetch_add(1, Ordering::Relaxed),
        );

        let mut connection = self.connection.clone();
        let mut invocation = self.script.prepare_invoke();
        invocation
            .key(format!("chirp:ratelimit:{key}"))
            .arg(now_ms)
            .arg(window_ms)
            .arg(self.policy.max_requests)
            .arg(member);

        let admitted: i64 = timeout(BACKEND_TIMEOUT, invocation.invoke_async(&mut connection))
            .await
            .map_err(|_| RateLimitError::Timeout(BACKEND_TIMEOUT))??;

        let allowed = admitted == 1;
        debug!(subject = key, allowed, "Rate limit decision");
        Ok(allowed)
    }
}
