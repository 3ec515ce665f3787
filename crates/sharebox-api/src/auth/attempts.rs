//! Failed authentication attempts, counted per client key.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Whether `key` has used up its failures for the current window.
    async fn is_blocked(&self, key: &str) -> bool;

    /// Count one failure; returns true once `key` is blocked.
    async fn record_failure(&self, key: &str) -> bool;

    /// Forget `key`'s failures.
    async fn reset(&self, key: &str);
}

/// Fixed-window counter held in process memory.
pub struct InMemoryAttemptStore {
    inner: Mutex<HashMap<String, (u32, Instant)>>,
    max_failures: u32,
    window: Duration,
}

impl InMemoryAttemptStore {
    pub fn new(max_failures: u32, window_seconds: u64) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            max_failures: max_failures.max(1),
            window: Duration::from_secs(window_seconds),
        }
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn is_blocked(&self, key: &str) -> bool {
        let mut guard = self.inner.lock().await;
        if let Some((count, reset_at)) = guard.get(key) {
            if Instant::now() >= *reset_at {
                guard.remove(key);
                return false;
            }
            return *count >= self.max_failures;
        }
        false
    }

    async fn record_failure(&self, key: &str) -> bool {
        let mut guard = self.inner.lock().await;
        let now = Instant::now();
        let (count, reset_at) = guard
            .entry(key.to_string())
            .or_insert((0, now + self.window));
        if now >= *reset_at {
            *count = 0;
            *reset_at = now + self.window;
        }
        *count += 1;
        *count >= self.max_failures
    }

    async fn reset(&self, key: &str) {
        self.inner.lock().await.remove(key);
    }
}
