use log::error;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::KvConfig;
use crate::error::{Error, Result};

pub mod cache;
pub mod rate_limit;

pub use cache::Cache;
pub use rate_limit::RateLimiter;

#[derive(Debug, Deserialize)]
struct CommandResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Upstash-compatible Redis REST client. Commands are posted as JSON arrays
/// (`["SET", key, value, "EX", "60"]`) and answered as `{"result": ...}`.
///
/// The store is an optional capability: callers hold an `Option<Arc<KvStore>>`
/// and decide per subsystem how its absence degrades (cache: silent miss,
/// rate limiter: local fallback, directory: 503).
#[derive(Debug)]
pub struct KvStore {
    client: Client,
    base_url: String,
    token: String,
}

impl KvStore {
    pub fn from_config(config: &KvConfig) -> Option<Self> {
        let url = config.rest_url.clone()?;
        let token = config.rest_token.clone()?;
        Some(Self {
            client: crate::api::http_client(),
            base_url: url,
            token,
        })
    }

    async fn command(&self, cmd: Vec<Value>) -> Result<Value> {
        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&cmd)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Upstream(format!("KV backend returned {}", status)));
        }

        let body: CommandResponse = response.json().await.map_err(|e| {
            error!("KV response parse failed: {}", e);
            Error::InvalidData(format!("KV response parse failed: {}", e))
        })?;

        if let Some(err) = body.error {
            return Err(Error::Upstream(format!("KV command failed: {}", err)));
        }
        Ok(body.result.unwrap_or(Value::Null))
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        match self.command(vec![json!("GET"), json!(key)]).await? {
            Value::Null => Ok(None),
            Value::String(raw) => Ok(Some(raw)),
            other => Ok(Some(other.to_string())),
        }
    }

    /// Plain SET; the value persists until overwritten.
    pub async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.command(vec![json!("SET"), json!(key), json!(value)])
            .await?;
        Ok(())
    }

    /// SET with a TTL in seconds.
    pub async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        self.command(vec![
            json!("SET"),
            json!(key),
            json!(value),
            json!("EX"),
            json!(ttl_secs.to_string()),
        ])
        .await?;
        Ok(())
    }

    /// Atomic increment; returns the post-increment counter value.
    pub async fn incr(&self, key: &str) -> Result<i64> {
        match self.command(vec![json!("INCR"), json!(key)]).await? {
            Value::Number(n) => n
                .as_i64()
                .ok_or_else(|| Error::InvalidData("INCR returned non-integer".to_string())),
            other => Err(Error::InvalidData(format!(
                "INCR returned unexpected value: {}",
                other
            ))),
        }
    }

    pub async fn expire(&self, key: &str, ttl_secs: u64) -> Result<()> {
        self.command(vec![
            json!("EXPIRE"),
            json!(key),
            json!(ttl_secs.to_string()),
        ])
        .await?;
        Ok(())
    }

    pub async fn del(&self, key: &str) -> Result<()> {
        self.command(vec![json!("DEL"), json!(key)]).await?;
        Ok(())
    }
}
