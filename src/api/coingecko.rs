use log::error;
use reqwest::Client;
use serde::Deserialize;

use crate::config::UpstreamConfig;
use crate::error::{Error, Result};

const TOKEN_ID: &str = "hyperliquid";
const API_KEY_HEADER: &str = "x-cg-demo-api-key";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UsdValue {
    #[serde(default)]
    pub usd: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenMarketData {
    #[serde(default)]
    pub current_price: UsdValue,
    #[serde(default)]
    pub market_cap: UsdValue,
    #[serde(default)]
    pub market_cap_change_percentage_24h: f64,
    #[serde(default)]
    pub total_volume: UsdValue,
    #[serde(default)]
    pub circulating_supply: f64,
    #[serde(default)]
    pub high_24h: UsdValue,
    #[serde(default)]
    pub low_24h: UsdValue,
    #[serde(default)]
    pub price_change_percentage_24h: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenData {
    pub id: String,
    pub symbol: String,
    pub name: String,
    #[serde(default)]
    pub market_data: TokenMarketData,
}

/// Historical chart; timestamps are float milliseconds on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketChart {
    #[serde(default)]
    pub prices: Vec<(f64, f64)>,
    #[serde(default)]
    pub market_caps: Vec<(f64, f64)>,
    #[serde(default)]
    pub total_volumes: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client: super::http_client(),
            base_url: base_url.into(),
            api_key,
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(config.coingecko_url.clone(), config.coingecko_api_key.clone())
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await.map_err(|e| {
            error!("CoinGecko request failed ({}): {}", path, e);
            Error::Upstream(format!("CoinGecko request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            error!("CoinGecko API error {} for {}", status, path);
            return Err(Error::Upstream(format!("CoinGecko API error: {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("CoinGecko response parse failed: {}", e)))
    }

    /// Full HYPE token snapshot (price, market cap, 24h extremes).
    pub async fn token_data(&self) -> Result<TokenData> {
        self.get(&format!("/coins/{}", TOKEN_ID)).await
    }

    /// Historical price chart over the last `days` days.
    pub async fn market_chart(&self, days: u32) -> Result<MarketChart> {
        self.get(&format!(
            "/coins/{}/market_chart?vs_currency=usd&days={}",
            TOKEN_ID, days
        ))
        .await
    }
}
