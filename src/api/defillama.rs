use log::{error, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::config::UpstreamConfig;
use crate::error::{Error, Result};

pub const HYPERLIQUID_PROTOCOL: &str = "hyperliquid";
const HYPERLIQUID_CHAIN: &str = "Hyperliquid L1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeDataType {
    DailyFees,
    DailyRevenue,
}

impl FeeDataType {
    fn as_str(self) -> &'static str {
        match self {
            FeeDataType::DailyFees => "dailyFees",
            FeeDataType::DailyRevenue => "dailyRevenue",
        }
    }
}

/// Fee/revenue aggregate for one protocol. `total_data_chart` is a daily
/// `[timestamp, value]` series; it is not guaranteed sorted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProtocolFees {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "total24h", default)]
    pub total_24h: f64,
    #[serde(rename = "total7d", default)]
    pub total_7d: f64,
    #[serde(rename = "totalAllTime", default)]
    pub total_all_time: f64,
    #[serde(rename = "change_1d", default)]
    pub change_1d: f64,
    #[serde(rename = "totalDataChart", default)]
    pub total_data_chart: Vec<(i64, f64)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainTvl {
    pub name: String,
    #[serde(default)]
    pub tvl: f64,
}

#[derive(Debug, Clone, Deserialize)]
struct HistoricalTvlPoint {
    #[serde(default)]
    date: i64,
    #[serde(default)]
    tvl: f64,
}

#[derive(Debug, Clone)]
pub struct DefiLlamaClient {
    client: Client,
    base_url: String,
}

impl DefiLlamaClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: super::http_client(),
            base_url: base_url.into(),
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(config.defillama_url.clone())
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                error!("DefiLlama request failed ({}): {}", path, e);
                Error::Upstream(format!("DefiLlama request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("DefiLlama API error {} for {}", status, path);
            return Err(Error::Upstream(format!("DefiLlama API error: {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| Error::InvalidData(format!("DefiLlama response parse failed: {}", e)))
    }

    /// All chains with their current TVL.
    pub async fn chains_with_tvl(&self) -> Result<Vec<ChainTvl>> {
        let chains: Vec<serde_json::Value> = self.get("/v2/chains").await?;
        Ok(chains
            .into_iter()
            .filter_map(|chain| serde_json::from_value::<ChainTvl>(chain).ok())
            .filter(|chain| !chain.name.is_empty())
            .collect())
    }

    /// Latest TVL point of a chain's historical series.
    pub async fn historical_chain_tvl(&self, chain: &str) -> Result<f64> {
        let series: Vec<HistoricalTvlPoint> = self
            .get(&format!("/v2/historicalChainTvl/{}", chain))
            .await?;
        let latest = series
            .iter()
            .max_by_key(|point| point.date)
            .map(|point| point.tvl)
            .unwrap_or(0.0);
        Ok(latest)
    }

    /// Current Hyperliquid L1 TVL; the chains listing is authoritative, the
    /// historical series is a fallback.
    pub async fn hyperliquid_l1_tvl(&self) -> Result<f64> {
        let chains = self.chains_with_tvl().await?;
        if let Some(chain) = chains.iter().find(|chain| {
            chain.name == HYPERLIQUID_CHAIN || chain.name.to_lowercase().contains("hyperliquid")
        }) {
            return Ok(chain.tvl);
        }

        warn!("Hyperliquid L1 not found in chains list, falling back to historical TVL");
        self.historical_chain_tvl(HYPERLIQUID_CHAIN).await
    }

    /// Fee or revenue summary for a protocol.
    pub async fn protocol_fees(
        &self,
        protocol: &str,
        data_type: FeeDataType,
    ) -> Result<ProtocolFees> {
        self.get(&format!(
            "/summary/fees/{}?dataType={}",
            protocol,
            data_type.as_str()
        ))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_fees_parses_chart_tuples() {
        let raw = r#"{
            "id":"1","name":"Hyperliquid","total24h":2500000.0,"total7d":18000000.0,
            "totalAllTime":900000000.0,"change_1d":-3.1,
            "totalDataChart":[[1700000000,100.5],[1700086400,200.25]]
        }"#;
        let fees: ProtocolFees = serde_json::from_str(raw).unwrap();
        assert_eq!(fees.total_data_chart.len(), 2);
        assert_eq!(fees.total_data_chart[0], (1700000000, 100.5));
        assert_eq!(fees.total_24h, 2500000.0);
    }

    #[test]
    fn protocol_fees_defaults_missing_chart() {
        let fees: ProtocolFees = serde_json::from_str(r#"{"name":"x"}"#).unwrap();
        assert!(fees.total_data_chart.is_empty());
    }

    #[test]
    fn fee_data_type_maps_to_query_values() {
        assert_eq!(FeeDataType::DailyFees.as_str(), "dailyFees");
        assert_eq!(FeeDataType::DailyRevenue.as_str(), "dailyRevenue");
    }
}
