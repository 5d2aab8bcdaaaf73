//! Standalone worker process: consumes the four domain topics and applies
//! interaction events. Deployable separately from the API servers, which
//! only produce.

use clipfeed::cache::CacheClient;
use clipfeed::{config, db, error, logging, workers};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = config::Config::from_env()?;

    if !cfg.bus_enabled() {
        return Err(error::AppError::Config(
            "KAFKA_BROKERS is required for the worker".into(),
        ));
    }

    let pool = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;

    // Without Redis the popularity worker is disabled; the state workers
    // only need Postgres.
    let cache = if cfg.cache_enabled() {
        match CacheClient::connect(&cfg.redis_url).await {
            Ok(client) => match client.ping().await {
                Ok(()) => Some(client),
                Err(e) => {
                    tracing::warn!(error = %e, "redis unreachable, popularity worker disabled");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "redis config error, popularity worker disabled");
                None
            }
        }
    } else {
        None
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = workers::spawn_all(&cfg, pool, cache, shutdown_rx)
        .map_err(|e| error::AppError::StartServer(format!("workers: {e}")))?;
    tracing::info!(count = handles.len(), "workers started");

    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    for handle in handles {
        let _ = handle.await;
    }
    tracing::info!("workers stopped");
    Ok(())
}
