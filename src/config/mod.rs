use std::env;

use crate::error::{Error, Result};

const DEFAULT_HYPERLIQUID_URL: &str = "https://api.hyperliquid.xyz";
const DEFAULT_HYPERLIQUID_TESTNET_URL: &str = "https://api.hyperliquid-testnet.xyz";
const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
const DEFAULT_DEFILLAMA_URL: &str = "https://api.llama.fi";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub kv: KvConfig,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub hyperliquid_url: String,
    pub hyperliquid_testnet_url: String,
    pub use_testnet: bool,
    pub coingecko_url: String,
    pub coingecko_api_key: Option<String>,
    pub defillama_url: String,
}

impl UpstreamConfig {
    /// Effective Hyperliquid base URL after the testnet selector is applied.
    pub fn hyperliquid_api_url(&self) -> &str {
        if self.use_testnet {
            &self.hyperliquid_testnet_url
        } else {
            &self.hyperliquid_url
        }
    }
}

/// Upstash-compatible Redis REST backend. Both fields must be present for the
/// backend to be considered configured; otherwise caching degrades to no-ops
/// and the directory store reports 503.
#[derive(Debug, Clone)]
pub struct KvConfig {
    pub rest_url: Option<String>,
    pub rest_token: Option<String>,
}

impl KvConfig {
    pub fn is_configured(&self) -> bool {
        self.rest_url.is_some() && self.rest_token.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub admin_user: Option<String>,
    pub admin_pass: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Requests allowed per client per 60-second window.
    pub per_minute: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let port = parse_env("HYPERDASH_PORT", 8080u16)?;
        let per_minute = parse_env("RATE_LIMIT_PER_MINUTE", 60u32)?;

        Ok(Self {
            server: ServerConfig {
                host: env_or("HYPERDASH_HOST", "127.0.0.1"),
                port,
            },
            upstream: UpstreamConfig {
                hyperliquid_url: env_or("HYPERLIQUID_API_URL", DEFAULT_HYPERLIQUID_URL),
                hyperliquid_testnet_url: env_or(
                    "HYPERLIQUID_TESTNET_API_URL",
                    DEFAULT_HYPERLIQUID_TESTNET_URL,
                ),
                use_testnet: env_flag("USE_TESTNET"),
                coingecko_url: env_or("COINGECKO_API_URL", DEFAULT_COINGECKO_URL),
                coingecko_api_key: env_opt("COINGECKO_API_KEY"),
                defillama_url: env_or("DEFILLAMA_API_URL", DEFAULT_DEFILLAMA_URL),
            },
            kv: KvConfig {
                rest_url: env_opt("UPSTASH_REDIS_REST_URL"),
                rest_token: env_opt("UPSTASH_REDIS_REST_TOKEN"),
            },
            auth: AuthConfig {
                admin_user: env_opt("BASIC_AUTH_USER"),
                admin_pass: env_opt("BASIC_AUTH_PASS"),
            },
            rate_limit: RateLimitConfig { per_minute },
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).ok().filter(|v| !v.is_empty()).unwrap_or_else(|| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    matches!(env::var(key).ok().as_deref(), Some("true") | Some("1"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) if !raw.is_empty() => raw
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {}: {}", key, raw))),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testnet_selector_switches_base_url() {
        let mut upstream = UpstreamConfig {
            hyperliquid_url: DEFAULT_HYPERLIQUID_URL.to_string(),
            hyperliquid_testnet_url: DEFAULT_HYPERLIQUID_TESTNET_URL.to_string(),
            use_testnet: false,
            coingecko_url: DEFAULT_COINGECKO_URL.to_string(),
            coingecko_api_key: None,
            defillama_url: DEFAULT_DEFILLAMA_URL.to_string(),
        };
        assert_eq!(upstream.hyperliquid_api_url(), DEFAULT_HYPERLIQUID_URL);

        upstream.use_testnet = true;
        assert_eq!(upstream.hyperliquid_api_url(), DEFAULT_HYPERLIQUID_TESTNET_URL);
    }

    #[test]
    fn kv_requires_both_url_and_token() {
        let kv = KvConfig {
            rest_url: Some("https://example.upstash.io".to_string()),
            rest_token: None,
        };
        assert!(!kv.is_configured());

        let kv = KvConfig {
            rest_url: Some("https://example.upstash.io".to_string()),
            rest_token: Some("token".to_string()),
        };
        assert!(kv.is_configured());
    }
}
