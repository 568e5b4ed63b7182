pub mod market;

pub use market::{
    AssetContext, AssetMeta, DashboardStats, HypePrice, MetaResponse, PricePoint, RevenueBucket,
    RevenueChart, RevenueKpis, SpotAsset, SpotMeta, SpotToken, TokenInfo,
};
