use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, warn};
use tokio::sync::Mutex;

use super::{cache, KvStore};
use crate::error::Result;

const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct LocalWindow {
    count: u32,
    reset_at: Instant,
}

/// Fixed-window request limiter keyed by client address.
///
/// With a KV backend the counter is an atomic `INCR` on a window-scoped key,
/// safe across server instances; the first increment of a window arms a
/// 60-second expiry. Without a backend (or when it errors) enforcement
/// prefers availability: KV errors fail open, and the in-process fallback map
/// is only meaningful for single-instance deployments.
#[derive(Debug)]
pub struct RateLimiter {
    store: Option<Arc<KvStore>>,
    limit: u32,
    window: Duration,
    local: Mutex<HashMap<String, LocalWindow>>,
}

impl RateLimiter {
    pub fn new(store: Option<Arc<KvStore>>, limit: u32) -> Self {
        Self {
            store,
            limit,
            window: WINDOW,
            local: Mutex::new(HashMap::new()),
        }
    }

    /// Shrink the window, for tests exercising window rollover.
    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Returns true when the request is allowed.
    pub async fn check(&self, client: &str) -> bool {
        if let Some(store) = &self.store {
            match self.check_remote(store, client).await {
                Ok(allowed) => return allowed,
                Err(e) => {
                    // Fail open: dashboard availability beats strict limits.
                    warn!("rate limit check failed for {}, allowing request: {}", client, e);
                    return true;
                }
            }
        }
        self.check_local(client).await
    }

    async fn check_remote(&self, store: &KvStore, client: &str) -> Result<bool> {
        let key = cache::keys::rate_limit(client);
        let count = store.incr(&key).await?;
        if count == 1 {
            store.expire(&key, cache::ttl::RATE_LIMIT).await?;
        }
        if count > self.limit as i64 {
            debug!("rate limit exceeded for {}: {} requests", client, count);
        }
        Ok(count <= self.limit as i64)
    }

    async fn check_local(&self, client: &str) -> bool {
        let now = Instant::now();
        let mut windows = self.local.lock().await;

        // Drop finished windows so the map does not grow with one-off clients.
        windows.retain(|_, w| w.reset_at > now);

        // Increment first, then compare, so both paths apply the same
        // `count <= limit` rule the KV counter uses.
        let window = windows.entry(client.to_string()).or_insert(LocalWindow {
            count: 0,
            reset_at: now + self.window,
        });
        window.count += 1;
        if window.count > self.limit {
            debug!("local rate limit exceeded for {}", client);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn local_limit_denies_past_the_ceiling() {
        let limiter = RateLimiter::new(None, 60);
        for _ in 0..60 {
            assert!(limiter.check("10.0.0.1").await);
        }
        // 61st request in the same window is denied.
        assert!(!limiter.check("10.0.0.1").await);
        // Other clients are unaffected.
        assert!(limiter.check("10.0.0.2").await);
    }

    #[tokio::test]
    async fn new_window_resets_the_counter() {
        let limiter = RateLimiter::new(None, 2).with_window(Duration::from_millis(50));
        assert!(limiter.check("c").await);
        assert!(limiter.check("c").await);
        assert!(!limiter.check("c").await);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(limiter.check("c").await);
    }

    #[tokio::test]
    async fn zero_limit_denies_the_first_request() {
        let limiter = RateLimiter::new(None, 0);
        assert!(!limiter.check("blocked").await);
    }

    #[tokio::test]
    async fn missing_backend_falls_back_to_local_counters() {
        let limiter = RateLimiter::new(None, 1);
        assert!(limiter.check("solo").await);
        assert!(!limiter.check("solo").await);
    }
}
