use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use std::sync::Arc;

use hyperdash::aggregator::Aggregator;
use hyperdash::cli::Cli;
use hyperdash::config::Config;
use hyperdash::directory::DirectoryStore;
use hyperdash::kv::{Cache, KvStore, RateLimiter};
use hyperdash::web::{AppState, WebServer};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    hyperdash::logging::init(cli.debug);

    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    info!(
        "upstreams: hyperliquid={} coingecko={} defillama={}",
        config.upstream.hyperliquid_api_url(),
        config.upstream.coingecko_url,
        config.upstream.defillama_url
    );

    let store = KvStore::from_config(&config.kv).map(Arc::new);
    if store.is_none() {
        warn!("KV backend not configured: caching disabled, directory endpoints will return 503");
    }

    let state = AppState {
        aggregator: Arc::new(Aggregator::from_config(&config)),
        cache: Cache::new(store.clone()),
        rate_limiter: Arc::new(RateLimiter::new(
            store.clone(),
            config.rate_limit.per_minute,
        )),
        directory: DirectoryStore::new(store),
        auth: config.auth.clone(),
    };

    WebServer::new(state)
        .start(&config.server.host, config.server.port)
        .await?;
    Ok(())
}
