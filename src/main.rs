use caching_proxy::cache::MemoryCache;
use caching_proxy::config::ProxyConfig;
use caching_proxy::server::ProxyServer;
use caching_proxy::shutdown::ShutdownCoordinator;
use caching_proxy::{logging, Result};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("caching-proxy: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = ProxyConfig::load()?;
    logging::init(&config.logging)?;

    info!(
        "caching-proxy {} (built {})",
        env!("BUILD_VERSION"),
        env!("BUILD_TIMESTAMP")
    );

    let cache = Arc::new(MemoryCache::new());
    let server = ProxyServer::bind(config, cache.clone()).await?;

    let coordinator = ShutdownCoordinator::new();
    let shutdown_signal = coordinator.subscribe();
    tokio::spawn(async move {
        if let Err(e) = coordinator.listen_for_signals().await {
            error!("Signal listener failed: {}", e);
        }
    });

    server.run(shutdown_signal).await?;

    let stats = cache.stats();
    info!(
        "Cache at shutdown: {} entries, {} hits, {} misses, {} stores",
        stats.entries, stats.hits, stats.misses, stats.stores
    );
    Ok(())
}
