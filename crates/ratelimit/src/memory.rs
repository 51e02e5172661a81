use std::collections::HashMap;
use std::future::Future;
use std::time::Instant;

use parking_lot::Mutex;
use tracing::debug;

use crate::{RateLimitConfig, RateLimitError, RateLimiter};

/// Sliding-window limiter holding request timestamps in process memory.
pub struct InMemoryRateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Vec<Instant>>>,
}

impl InMemoryRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Admit a request from `client_id` at `now`.
    ///
    /// Timestamps older than the window are pruned first. A rejected request
    /// is not recorded.
    pub fn admit_at(&self, client_id: &str, now: Instant) -> bool {
        let mut windows = self.windows.lock();

        if windows.len() > self.config.cleanup_threshold {
            self.sweep(&mut windows, now);
        }

        let timestamps = windows.entry(client_id.to_string()).or_default();
        timestamps.retain(|&t| now.saturating_duration_since(t) < self.config.window);

        if timestamps.len() >= self.config.max_requests {
            return false;
        }
        timestamps.push(now);
        true
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().len()
    }

    /// Drop clients with no timestamp left inside the window.
    fn sweep(&self, windows: &mut HashMap<String, Vec<Instant>>, now: Instant) {
        let before = windows.len();
        let window = self.config.window;
        windows.retain(|_, timestamps| {
            timestamps
                .iter()
                .any(|&t| now.saturating_duration_since(t) < window)
        });
        debug!(before, after = windows.len(), "Swept idle rate-limit windows");
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn admit(&self, client_id: &str) -> impl Future<Output = Result<bool, RateLimitError>> + Send {
        std::future::ready(Ok(self.admit_at(client_id, Instant::now())))
    }
}
