use std::sync::Arc;

use feedbridge::modules;
use feedbridge::proxy;
use feedbridge::proxy::session::{MemoryStore, RedisStore, SessionStore};
use feedbridge::proxy::upstream::UpstreamClient;

#[tokio::main]
async fn main() -> Result<(), String> {
    modules::logger::init_logger();

    let config = modules::config::BridgeConfig::from_env();

    if config.default_origin.is_none() {
        tracing::warn!(
            "no default origin configured; requests without an Origin header will fail"
        );
    }

    let store: Arc<dyn SessionStore> = match &config.redis_url {
        Some(url) => {
            let store = RedisStore::connect(url)
                .await
                .map_err(|e| format!("failed to connect session store: {}", e))?;
            tracing::info!("session store: redis");
            Arc::new(store)
        }
        None => {
            tracing::warn!(
                "FEEDBRIDGE_REDIS_URL not set; using in-memory session store (single process only)"
            );
            Arc::new(MemoryStore::new())
        }
    };

    let upstream = UpstreamClient::new(
        &config.upstream_base_url,
        config.egress_proxy_url.as_deref(),
    )
    .map_err(|e| format!("failed to build upstream client: {}", e))?;

    tracing::info!("bridging upstream {}", config.upstream_base_url);

    let state = proxy::AppState {
        config: Arc::new(config),
        store,
        upstream: Arc::new(upstream),
        tasks: proxy::DetachedTasks::new(),
    };
    let tasks = state.tasks.clone();

    let (server, handle) = proxy::AxumServer::start(state)
        .await
        .map_err(|e| format!("failed to start proxy server: {}", e))?;

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown signal: {}", e))?;

    tracing::info!("shutdown requested, stopping server...");
    server.stop();
    let _ = handle.await;

    // Drain in-flight store writes/deletes before exiting
    tasks.quiesce().await;

    Ok(())
}
