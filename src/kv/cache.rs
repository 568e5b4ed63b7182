use std::sync::Arc;

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::KvStore;

/// Cache key layout, one prefix per data category.
pub mod keys {
    pub const DASHBOARD_STATS: &str = "dashboard:stats";
    pub const HYPE_PRICE: &str = "dashboard:hype-price";
    pub const HOT_TOKENS: &str = "dashboard:hot-tokens";
    pub const TOP_GAINERS: &str = "dashboard:top-gainers";
    pub const NEW_TOKENS: &str = "dashboard:new-tokens";
    pub const DEFILLAMA_REVENUE: &str = "api:defillama-revenue";

    pub fn revenue(time_view: &str) -> String {
        format!("dashboard:revenue:{}", time_view)
    }

    pub fn rate_limit(client: &str) -> String {
        format!("ratelimit:{}", client)
    }
}

/// TTL per data category, in seconds.
pub mod ttl {
    pub const DASHBOARD_STATS: u64 = 60;
    pub const HYPE_PRICE: u64 = 30;
    pub const REVENUE_DATA: u64 = 300;
    pub const HOT_TOKENS: u64 = 60;
    pub const TOP_GAINERS: u64 = 60;
    pub const NEW_TOKENS: u64 = 300;
    pub const DEFILLAMA_REVENUE: u64 = 300;
    pub const RATE_LIMIT: u64 = 60;
}

/// JSON cache over the optional KV backend. Caching is an optimization, not a
/// correctness requirement: every failure mode (backend absent, transport
/// error, undecodable payload) degrades to a miss or a no-op.
#[derive(Debug, Clone)]
pub struct Cache {
    store: Option<Arc<KvStore>>,
}

impl Cache {
    pub fn new(store: Option<Arc<KvStore>>) -> Self {
        Self { store }
    }

    pub fn disabled() -> Self {
        Self { store: None }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let store = self.store.as_ref()?;
        match store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => Some(value),
                Err(e) => {
                    // Undecodable entries count as a miss; the fresh fetch
                    // will overwrite them.
                    debug!("cache entry for {} is undecodable: {}", key, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                debug!("cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("cache serialize failed for {}: {}", key, e);
                return;
            }
        };
        if let Err(e) = store.set_ex(key, &raw, ttl_secs).await {
            debug!("cache write failed for {}: {}", key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revenue_key_includes_time_view() {
        assert_eq!(keys::revenue("month"), "dashboard:revenue:month");
        assert_eq!(keys::revenue("day"), "dashboard:revenue:day");
    }

    #[test]
    fn rate_limit_key_includes_client() {
        assert_eq!(keys::rate_limit("10.0.0.1"), "ratelimit:10.0.0.1");
    }

    #[tokio::test]
    async fn disabled_cache_is_a_silent_miss() {
        let cache = Cache::disabled();
        let value: Option<Vec<u32>> = cache.get("dashboard:stats").await;
        assert!(value.is_none());
        // Writes are a no-op, not an error.
        cache.set("dashboard:stats", &vec![1u32, 2, 3], 60).await;
    }
}
