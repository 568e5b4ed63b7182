use log::error;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::UpstreamConfig;
use crate::error::{Error, Result};
use crate::models::{AssetContext, MetaResponse, SpotMeta};

/// Client for the Hyperliquid `/info` endpoint. Every query is a POST with a
/// `type` discriminator; mainnet vs testnet is decided once at construction.
#[derive(Debug, Clone)]
pub struct HyperliquidClient {
    client: Client,
    base_url: String,
}

impl HyperliquidClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: super::http_client(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(config.hyperliquid_api_url())
    }

    async fn info<T: DeserializeOwned>(&self, body: serde_json::Value) -> Result<T> {
        let url = format!("{}/info", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("Hyperliquid request failed ({}): {}", body["type"], e);
                Error::Upstream(format!("Hyperliquid request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Hyperliquid /info returned {} for {}", status, body["type"]);
            return Err(Error::Upstream(format!(
                "Hyperliquid /info returned {}",
                status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("Hyperliquid response parse failed: {}", e)))
    }

    /// Perp universe metadata plus per-asset contexts, positionally paired.
    pub async fn meta_and_asset_ctxs(&self) -> Result<(MetaResponse, Vec<AssetContext>)> {
        self.info(json!({ "type": "metaAndAssetCtxs" })).await
    }

    /// Spot universe metadata plus per-pair contexts, positionally paired.
    pub async fn spot_meta_and_asset_ctxs(&self) -> Result<(SpotMeta, Vec<AssetContext>)> {
        self.info(json!({ "type": "spotMetaAndAssetCtxs" })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_and_ctxs_tuple_shape_deserializes() {
        // The /info response is a heterogeneous two-element array.
        let raw = r#"[
            {"universe":[{"name":"BTC","szDecimals":5,"maxLeverage":50}]},
            [{"dayNtlVlm":"100.0","markPx":"65000","prevDayPx":"64000","funding":"0.0001",
              "openInterest":"12.3","oraclePx":"65001","impactPxs":["64999","65002"]}]
        ]"#;
        let (meta, ctxs): (MetaResponse, Vec<AssetContext>) = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.universe.len(), 1);
        assert_eq!(meta.universe[0].name, "BTC");
        assert_eq!(ctxs.len(), 1);
        assert_eq!(ctxs[0].mark(), 65000.0);
        assert_eq!(
            ctxs[0].impact_prices,
            Some(("64999".to_string(), "65002".to_string()))
        );
    }

    #[test]
    fn spot_meta_tuple_shape_deserializes() {
        let raw = r#"[
            {"universe":[{"name":"PURR/USDC","index":0,"isCanonical":true}],
             "tokens":[{"name":"PURR","szDecimals":0,"index":1,"isCanonical":true}]},
            [{"dayNtlVlm":"42.0","markPx":"0.5","prevDayPx":"0.4"}]
        ]"#;
        let (meta, ctxs): (SpotMeta, Vec<AssetContext>) = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.universe[0].name, "PURR/USDC");
        assert_eq!(meta.tokens[0].name, "PURR");
        assert_eq!(ctxs[0].day_volume(), 42.0);
    }
}
