//! Per-client request rate limiting over a sliding time window.
//!
//! `InMemoryRateLimiter` keeps the window in process memory and is only accurate
//! for a single long-lived instance. With the `redis` feature,
//! `RedisRateLimiter` keeps the window in a shared store so every serving
//! instance counts against the same budget.

mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use memory::InMemoryRateLimiter;
#[cfg(feature = "redis")]
pub use redis_store::RedisRateLimiter;

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Rate limit store unavailable: {0}")]
    Store(String),
}

/// Window size and budget shared by all limiter stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests admitted per client within one window
    pub max_requests: usize,
    /// Window length
    #[serde(with = "duration_secs")]
    pub window: Duration,
    /// Client count above which idle clients are swept from memory
    pub cleanup_threshold: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
            cleanup_threshold: 1000,
        }
    }
}

/// Admission control keyed by client identity.
pub trait RateLimiter: Send + Sync {
    /// Record a request from `client_id` now. Returns `false` when the client
    /// has exhausted its budget for the current window.
    fn admit(&self, client_id: &str) -> impl Future<Output = Result<bool, RateLimitError>> + Send;
}

/// Limiter store selected at startup.
pub enum AnyRateLimiter {
    Memory(InMemoryRateLimiter),
    #[cfg(feature = "redis")]
    Redis(RedisRateLimiter),
}

impl RateLimiter for AnyRateLimiter {
    async fn admit(&self, client_id: &str) -> Result<bool, RateLimitError> {
        match self {
            Self::Memory(limiter) => limiter.admit(client_id).await,
            #[cfg(feature = "redis")]
            Self::Redis(limiter) => limiter.admit(client_id).await,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
