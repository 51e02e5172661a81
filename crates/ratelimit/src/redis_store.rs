use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use redis::aio::ConnectionManager;
use redis::Script;
use tracing::warn;

use crate::{RateLimitConfig, RateLimitError, RateLimiter};

/// Prune, count, conditionally add, and refresh expiry in one atomic step.
///
/// KEYS[1] window key; ARGV: now_ms, window_ms, max_requests, member.
const SLIDING_WINDOW_SCRIPT: &str = r#"
redis.call('ZREMRANGEBYSCORE', KEYS[1], '-inf', tonumber(ARGV[1]) - tonumber(ARGV[2]))
local count = redis.call('ZCARD', KEYS[1])
if count >= tonumber(ARGV[3]) then
  return 0
end
redis.call('ZADD', KEYS[1], ARGV[1], ARGV[4])
redis.call('PEXPIRE', KEYS[1], ARGV[2])
return 1
"#;

/// Sliding-window limiter backed by a Redis sorted set per client.
///
/// Expiry on each key bounds memory the same way the in-memory sweep does.
pub struct RedisRateLimiter {
    config: RateLimitConfig,
    connection: ConnectionManager,
    script: Script,
    key_prefix: String,
    sequence: AtomicU64,
}

impl RedisRateLimiter {
    /// Connect to the Redis instance at `url`.
    pub async fn connect(url: &str, config: RateLimitConfig) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(url).map_err(|e| RateLimitError::Store(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| RateLimitError::Store(e.to_string()))?;

        Ok(Self {
            config,
            connection,
            script: Script::new(SLIDING_WINDOW_SCRIPT),
            key_prefix: "brandcheck:ratelimit".to_string(),
            sequence: AtomicU64::new(0),
        })
    }

    /// Prefix keys with `prefix` instead of `brandcheck:ratelimit`.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }
}

/// Sorted-set key holding one client's window.
fn window_key(prefix: &str, client_id: &str) -> String {
    format!("{}:{}", prefix, client_id)
}

/// Sorted-set member for one request; unique even within a millisecond.
fn request_member(now_ms: u64, sequence: u64) -> String {
    format!("{}-{}", now_ms, sequence)
}

impl RateLimiter for RedisRateLimiter {
    async fn admit(&self, client_id: &str) -> Result<bool, RateLimitError> {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| RateLimitError::Store(e.to_string()))?
            .as_millis() as u64;
        let window_ms = self.config.window.as_millis() as u64;
        let member = request_member(now_ms, self.sequence.fetch_add(1, Ordering::Relaxed));

        let mut connection = self.connection.clone();
        let admitted: i64 = self
            .script
            .key(window_key(&self.key_prefix, client_id))
            .arg(now_ms)
            .arg(window_ms)
            .arg(self.config.max_requests)
            .arg(member)
            .invoke_async(&mut connection)
            .await
            .map_err(|e| {
                warn!(client_id, error = %e, "Rate limit script failed");
                RateLimitError::Store(e.to_string())
            })?;

        Ok(admitted == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_window_key() {
        assert_eq!(
            window_key("brandcheck:ratelimit", "203.0.113.7"),
            "brandcheck:ratelimit:203.0.113.7"
        );
    }

    #[test]
    fn test_request_members_are_unique_within_a_millisecond() {
        assert_ne!(request_member(1_700_000_000_000, 0), request_member(1_700_000_000_000, 1));
        assert_eq!(request_member(42, 7), "42-7");
    }

    #[test]
    fn test_script_prunes_before_counting() {
        let prune = SLIDING_WINDOW_SCRIPT.find("ZREMRANGEBYSCORE").unwrap();
        let count = SLIDING_WINDOW_SCRIPT.find("ZCARD").unwrap();
        let add = SLIDING_WINDOW_SCRIPT.find("ZADD").unwrap();
        assert!(prune < count && count < add);
    }

    async fn limiter(max_requests: usize, window: Duration) -> RedisRateLimiter {
        let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1/".to_string());
        let config = RateLimitConfig {
            max_requests,
            window,
            cleanup_threshold: 1000,
        };
        let prefix = format!("brandcheck:test:{}", std::process::id());
        RedisRateLimiter::connect(&url, config)
            .await
            .unwrap()
            .with_key_prefix(prefix)
    }

    #[tokio::test]
    #[ignore = "needs a Redis server at REDIS_URL"]
    async fn test_rejects_over_budget_per_client() {
        let limiter = limiter(2, Duration::from_secs(60)).await;

        assert!(limiter.admit("budget-a").await.unwrap());
        assert!(limiter.admit("budget-a").await.unwrap());
        assert!(!limiter.admit("budget-a").await.unwrap());
        assert!(limiter.admit("budget-b").await.unwrap());
    }

    #[tokio::test]
    #[ignore = "needs a Redis server at REDIS_URL"]
    async fn test_window_expiry_admits_again() {
        let limiter = limiter(1, Duration::from_millis(300)).await;

        assert!(limiter.admit("expiry").await.unwrap());
        assert!(!limiter.admit("expiry").await.unwrap());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(limiter.admit("expiry").await.unwrap());
    }
}
