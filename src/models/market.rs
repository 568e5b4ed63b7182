use serde::{Deserialize, Serialize};

/// Perp asset metadata from the Hyperliquid `meta` snapshot. Immutable per
/// response; paired positionally with [`AssetContext`] by index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetMeta {
    pub name: String,
    #[serde(rename = "szDecimals", default)]
    pub size_decimals: u32,
    #[serde(rename = "maxLeverage", default)]
    pub max_leverage: u32,
    #[serde(rename = "onlyIsolated", default)]
    pub isolated_only: bool,
    #[serde(rename = "isDelisted", default)]
    pub delisted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaResponse {
    #[serde(default)]
    pub universe: Vec<AssetMeta>,
}

/// Per-asset market context. All numeric fields arrive as decimal strings and
/// are kept that way until a consumer actually needs a number, so formatting
/// precision is never lost in transit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetContext {
    #[serde(rename = "dayNtlVlm", default)]
    pub day_volume_notional: String,
    #[serde(default)]
    pub funding: String,
    #[serde(rename = "markPx", default)]
    pub mark_price: String,
    #[serde(rename = "midPx", default)]
    pub mid_price: Option<String>,
    #[serde(rename = "openInterest", default)]
    pub open_interest: String,
    #[serde(rename = "oraclePx", default)]
    pub oracle_price: String,
    #[serde(rename = "prevDayPx", default)]
    pub previous_day_price: String,
    /// [low, high] impact prices; perp contexts only.
    #[serde(rename = "impactPxs", default)]
    pub impact_prices: Option<(String, String)>,
}

impl AssetContext {
    pub fn mark(&self) -> f64 {
        self.mark_price.parse().unwrap_or(0.0)
    }

    pub fn previous_day(&self) -> f64 {
        self.previous_day_price.parse().unwrap_or(0.0)
    }

    pub fn day_volume(&self) -> f64 {
        self.day_volume_notional.parse().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotAsset {
    pub name: String,
    #[serde(default)]
    pub index: u32,
    #[serde(rename = "isCanonical", default)]
    pub is_canonical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotToken {
    pub name: String,
    #[serde(rename = "szDecimals", default)]
    pub size_decimals: u32,
    #[serde(default)]
    pub index: u32,
    #[serde(rename = "isCanonical", default)]
    pub is_canonical: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotMeta {
    #[serde(default)]
    pub universe: Vec<SpotAsset>,
    #[serde(default)]
    pub tokens: Vec<SpotToken>,
}

/// Normalized token row for the ranking panels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub name: String,
    pub symbol: String,
    /// Pre-formatted display price, e.g. `US$12.34`.
    pub price: String,
    /// 24h change in percent, rounded to one decimal place.
    pub change_24h: f64,
    /// Raw upstream notional volume string.
    pub volume_24h: String,
}

/// Point-in-time dashboard snapshot; recomputed per request, cache-subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: u64,
    pub total_market_cap: String,
    pub market_cap_change: f64,
    pub total_value_locked: String,
    pub tvl_change: f64,
    pub volume_24h: String,
    pub hyperevm_tps: f64,
}

impl DashboardStats {
    /// All-zero snapshot used when every upstream is down; read paths always
    /// render something.
    pub fn zeroed() -> Self {
        Self {
            total_users: 0,
            total_market_cap: "US$0".to_string(),
            market_cap_change: 0.0,
            total_value_locked: "US$0".to_string(),
            tvl_change: 0.0,
            volume_24h: "US$0".to_string(),
            hyperevm_tps: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    /// Milliseconds since epoch.
    pub time: i64,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HypePrice {
    pub current: String,
    pub change_24h: f64,
    pub low_24h: String,
    pub high_24h: String,
    pub chart_data: Vec<PricePoint>,
}

impl HypePrice {
    pub fn zeroed() -> Self {
        Self {
            current: "0".to_string(),
            change_24h: 0.0,
            low_24h: "0".to_string(),
            high_24h: "0".to_string(),
            chart_data: Vec::new(),
        }
    }
}

/// One UTC calendar bucket of the fees/revenue chart. The wire field is
/// `month` for both views; daily buckets carry an `MM-DD` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevenueBucket {
    #[serde(rename = "month")]
    pub period: String,
    pub fees: f64,
    pub revenue: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevenueChart {
    #[serde(rename = "totalDataChart")]
    pub total_data_chart: Vec<(i64, f64)>,
    #[serde(rename = "isMockData", skip_serializing_if = "Option::is_none")]
    pub is_mock_data: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueKpis {
    pub total_24h: f64,
    pub total_7d: f64,
    pub total_30d: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_meta_parses_upstream_field_names() {
        let raw = r#"{"name":"HYPE","szDecimals":2,"maxLeverage":20,"onlyIsolated":true}"#;
        let meta: AssetMeta = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.name, "HYPE");
        assert_eq!(meta.size_decimals, 2);
        assert_eq!(meta.max_leverage, 20);
        assert!(meta.isolated_only);
        assert!(!meta.delisted);
    }

    #[test]
    fn asset_context_tolerates_missing_fields() {
        let raw = r#"{"dayNtlVlm":"123.45","markPx":"1.5","prevDayPx":"1.2"}"#;
        let ctx: AssetContext = serde_json::from_str(raw).unwrap();
        assert_eq!(ctx.day_volume(), 123.45);
        assert_eq!(ctx.mark(), 1.5);
        assert_eq!(ctx.previous_day(), 1.2);
        assert!(ctx.mid_price.is_none());
        assert!(ctx.impact_prices.is_none());
    }

    #[test]
    fn asset_context_numeric_accessors_guard_bad_strings() {
        let ctx: AssetContext = serde_json::from_str(r#"{"markPx":"not-a-number"}"#).unwrap();
        assert_eq!(ctx.mark(), 0.0);
    }

    #[test]
    fn token_info_serializes_camel_case() {
        let info = TokenInfo {
            name: "PURR".to_string(),
            symbol: "PURR".to_string(),
            price: "US$0.123456".to_string(),
            change_24h: 4.2,
            volume_24h: "1000.0".to_string(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["change24h"], 4.2);
        assert_eq!(json["volume24h"], "1000.0");
    }

    #[test]
    fn revenue_chart_omits_mock_flag_for_real_data() {
        let chart = RevenueChart {
            total_data_chart: vec![(1, 2.0)],
            is_mock_data: None,
        };
        let json = serde_json::to_string(&chart).unwrap();
        assert!(!json.contains("isMockData"));
    }
}
