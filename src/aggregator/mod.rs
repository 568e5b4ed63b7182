//! Turns raw upstream payloads into the dashboard's view models. Every
//! public method degrades instead of failing: an upstream outage produces
//! zeroed stats, an empty panel, or a flagged synthetic series, never an
//! error surfaced to the read path.

pub mod rankings;
pub mod series;

use chrono::Utc;
use log::{error, warn};
use rand::Rng;
use serde::Serialize;

use crate::api::defillama::{FeeDataType, HYPERLIQUID_PROTOCOL};
use crate::api::{CoinGeckoClient, DefiLlamaClient, HyperliquidClient};
use crate::config::Config;
use crate::models::{
    AssetContext, AssetMeta, DashboardStats, HypePrice, PricePoint, RevenueBucket,
    RevenueChart, RevenueKpis, SpotAsset, TokenInfo,
};
use crate::utils::format::{format_currency, round_dp};

pub use series::TimeView;

const HYPE_SYMBOL: &str = "HYPE";
const FALLBACK_CHART_HOURS: i64 = 24;

/// One perps universe entry with its market context, for clients that render
/// the raw table themselves. The short field names are the wire contract.
#[derive(Debug, Clone, Serialize)]
pub struct PerpPair {
    pub u: AssetMeta,
    pub c: AssetContext,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    hyperliquid: HyperliquidClient,
    coingecko: CoinGeckoClient,
    defillama: DefiLlamaClient,
}

impl Aggregator {
    pub fn new(
        hyperliquid: HyperliquidClient,
        coingecko: CoinGeckoClient,
        defillama: DefiLlamaClient,
    ) -> Self {
        Self {
            hyperliquid,
            coingecko,
            defillama,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            HyperliquidClient::from_config(&config.upstream),
            CoinGeckoClient::from_config(&config.upstream),
            DefiLlamaClient::from_config(&config.upstream),
        )
    }

    /// Headline stats: HYPE market cap, chain TVL, perps volume. The three
    /// upstreams are independent, so each failure degrades its own field.
    pub async fn dashboard_stats(&self) -> DashboardStats {
        let (token, tvl, perps_volume) = tokio::join!(
            self.coingecko.token_data(),
            self.defillama.hyperliquid_l1_tvl(),
            self.perps_volume(),
        );

        let tvl = tvl.unwrap_or_else(|e| {
            warn!("TVL unavailable: {}", e);
            0.0
        });

        let mut stats = DashboardStats::zeroed();
        stats.total_value_locked = format_currency(tvl, "US$", 0);
        stats.volume_24h = format_currency(perps_volume, "US$", 0);

        match token {
            Ok(token) => {
                stats.total_market_cap =
                    format_currency(token.market_data.market_cap.usd, "US$", 0);
                stats.market_cap_change =
                    round_dp(token.market_data.market_cap_change_percentage_24h, 2);
            }
            Err(e) => warn!("CoinGecko unavailable for market cap: {}", e),
        }

        stats
    }

    /// Sum of 24h notional volume over the whole perps universe.
    pub async fn try_perps_volume(&self) -> crate::Result<f64> {
        let (_, ctxs) = self.hyperliquid.meta_and_asset_ctxs().await?;
        Ok(ctxs.iter().map(AssetContext::day_volume).sum())
    }

    pub async fn perps_volume(&self) -> f64 {
        self.try_perps_volume().await.unwrap_or_else(|e| {
            error!("perps volume unavailable: {}", e);
            0.0
        })
    }

    /// The safely paired perps universe.
    pub async fn perps_pairs(&self) -> crate::Result<Vec<PerpPair>> {
        let (meta, ctxs) = self.hyperliquid.meta_and_asset_ctxs().await?;
        Ok(series::zip_by_min(&meta.universe, &ctxs, "perps universe")
            .into_iter()
            .map(|(u, c)| PerpPair {
                u: u.clone(),
                c: c.clone(),
            })
            .collect())
    }

    /// HYPE spot price with a 24h chart. CoinGecko is the primary source;
    /// the venue's own mark price stands in when it is down.
    pub async fn hype_price(&self) -> HypePrice {
        match self.coingecko.token_data().await {
            Ok(token) => {
                let chart_data = match self.coingecko.market_chart(1).await {
                    Ok(chart) => chart
                        .prices
                        .into_iter()
                        .map(|(time, price)| PricePoint {
                            time: time as i64,
                            price,
                        })
                        .collect(),
                    Err(e) => {
                        warn!("HYPE market chart unavailable: {}", e);
                        Vec::new()
                    }
                };

                let market = token.market_data;
                HypePrice {
                    current: format!("{:.4}", market.current_price.usd),
                    change_24h: round_dp(market.price_change_percentage_24h, 2),
                    low_24h: format!("{:.4}", market.low_24h.usd),
                    high_24h: format!("{:.4}", market.high_24h.usd),
                    chart_data,
                }
            }
            Err(e) => {
                warn!("CoinGecko unavailable, falling back to mark price: {}", e);
                self.hype_price_from_venue().await
            }
        }
    }

    async fn hype_price_from_venue(&self) -> HypePrice {
        let (meta, ctxs) = match self.hyperliquid.meta_and_asset_ctxs().await {
            Ok(pair) => pair,
            Err(e) => {
                error!("HYPE price unavailable from every source: {}", e);
                return HypePrice::zeroed();
            }
        };

        let hype = meta
            .universe
            .iter()
            .position(|asset| asset.name == HYPE_SYMBOL)
            .and_then(|index| ctxs.get(index));
        let ctx = match hype {
            Some(ctx) => ctx,
            None => {
                error!("{} not found in perps universe", HYPE_SYMBOL);
                return HypePrice::zeroed();
            }
        };

        let current = ctx.mark();
        let change = round_dp(series::percent_change(current, ctx.previous_day()), 2);
        // No real intraday history on this path; sketch a jittered flat line
        // so the chart renders.
        let now_ms = Utc::now().timestamp_millis();
        let mut rng = rand::thread_rng();
        let chart_data = (0..FALLBACK_CHART_HOURS)
            .map(|i| PricePoint {
                time: now_ms - (FALLBACK_CHART_HOURS - 1 - i) * 3_600_000,
                price: current * (0.95 + rng.gen::<f64>() * 0.1),
            })
            .collect();

        let (low, high) = match &ctx.impact_prices {
            Some((low, high)) => (low.clone(), high.clone()),
            None => ("0".to_string(), "0".to_string()),
        };

        HypePrice {
            current: format!("{:.4}", current),
            change_24h: change,
            low_24h: low,
            high_24h: high,
            chart_data,
        }
    }

    /// Fees/revenue chart bucketed by UTC month or day. Both series must be
    /// present; a half-available chart would silently misstate margins.
    pub async fn revenue_data(&self, view: TimeView) -> Vec<RevenueBucket> {
        let (fees, revenue) = tokio::join!(
            self.defillama
                .protocol_fees(HYPERLIQUID_PROTOCOL, FeeDataType::DailyFees),
            self.defillama
                .protocol_fees(HYPERLIQUID_PROTOCOL, FeeDataType::DailyRevenue),
        );

        match (fees, revenue) {
            (Ok(fees), Ok(revenue)) => series::build_revenue_buckets(
                &fees.total_data_chart,
                &revenue.total_data_chart,
                view,
            ),
            (fees, revenue) => {
                if let Err(e) = fees {
                    warn!("fees chart unavailable: {}", e);
                }
                if let Err(e) = revenue {
                    warn!("revenue chart unavailable: {}", e);
                }
                Vec::new()
            }
        }
    }

    /// Raw daily revenue series. An outage or empty response yields the
    /// synthetic series, always flagged as mock data.
    pub async fn revenue_chart(&self) -> RevenueChart {
        match self
            .defillama
            .protocol_fees(HYPERLIQUID_PROTOCOL, FeeDataType::DailyRevenue)
            .await
        {
            Ok(fees) if !fees.total_data_chart.is_empty() => RevenueChart {
                total_data_chart: fees.total_data_chart,
                is_mock_data: None,
            },
            Ok(_) => {
                warn!("DefiLlama returned an empty revenue chart, serving mock data");
                RevenueChart {
                    total_data_chart: series::synthetic_revenue_series(Utc::now()),
                    is_mock_data: Some(true),
                }
            }
            Err(e) => {
                warn!("DefiLlama revenue unavailable, serving mock data: {}", e);
                RevenueChart {
                    total_data_chart: series::synthetic_revenue_series(Utc::now()),
                    is_mock_data: Some(true),
                }
            }
        }
    }

    /// Trailing revenue KPIs over the same series (or its synthetic stand-in)
    /// that the revenue chart serves.
    pub async fn revenue_kpis(&self) -> RevenueKpis {
        let chart = self.revenue_chart().await;
        series::revenue_kpis(&chart.total_data_chart, Utc::now())
    }

    pub async fn hot_tokens(&self) -> Vec<TokenInfo> {
        self.ranked_spot(rankings::hot_tokens).await
    }

    pub async fn top_gainers(&self) -> Vec<TokenInfo> {
        self.ranked_spot(rankings::top_gainers).await
    }

    pub async fn new_tokens(&self) -> Vec<TokenInfo> {
        self.ranked_spot(rankings::new_tokens).await
    }

    async fn ranked_spot<F>(&self, rank: F) -> Vec<TokenInfo>
    where
        F: FnOnce(&[(&SpotAsset, &AssetContext)]) -> Vec<TokenInfo>,
    {
        match self.hyperliquid.spot_meta_and_asset_ctxs().await {
            Ok((meta, ctxs)) => {
                let pairs = series::zip_by_min(&meta.universe, &ctxs, "spot universe");
                rank(&pairs)
            }
            Err(e) => {
                error!("spot universe unavailable: {}", e);
                Vec::new()
            }
        }
    }
}
