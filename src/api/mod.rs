use std::time::Duration;

use reqwest::Client;

pub mod coingecko;
pub mod defillama;
pub mod hyperliquid;

pub use coingecko::CoinGeckoClient;
pub use defillama::DefiLlamaClient;
pub use hyperliquid::HyperliquidClient;

/// Upstream calls are treated as failed after this long; the caller then
/// follows the same fallback path as any other adapter failure.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub(crate) fn http_client() -> Client {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}
