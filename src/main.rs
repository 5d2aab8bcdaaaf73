use clipfeed::cache::CacheClient;
use clipfeed::events::EventPublisher;
use clipfeed::{config, db, error, logging, routes, state::AppState, workers};
use std::sync::Arc;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    logging::init_tracing();
    let cfg = Arc::new(config::Config::from_env()?);

    let pool = db::init_pool(&cfg.database_url)
        .await
        .map_err(|e| error::AppError::StartServer(format!("db: {e}")))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| error::AppError::StartServer(format!("migrations: {e}")))?;

    // Redis is optional: without it reads go straight to Postgres and the
    // auth gate verifies every token against the account row.
    let cache = if cfg.cache_enabled() {
        match CacheClient::connect(&cfg.redis_url).await {
            Ok(client) => match client.ping().await {
                Ok(()) => {
                    tracing::info!("redis connected, cache enabled");
                    Some(client)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "redis unreachable, cache disabled");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "redis config error, cache disabled");
                None
            }
        }
    } else {
        None
    };

    // Kafka is optional: without it every write takes its direct fallback.
    let events = if cfg.bus_enabled() {
        match EventPublisher::new(&cfg.kafka_brokers) {
            Ok(publisher) => {
                tracing::info!("kafka producer initialized");
                Some(publisher)
            }
            Err(e) => {
                tracing::warn!(error = %e, "kafka producer init failed, bus disabled");
                None
            }
        }
    } else {
        None
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Same-process worker deployment mode.
    let mut worker_handles = Vec::new();
    if cfg.workers_inline && cfg.bus_enabled() {
        match workers::spawn_all(&cfg, pool.clone(), cache.clone(), shutdown_rx.clone()) {
            Ok(handles) => {
                tracing::info!(count = handles.len(), "inline workers started");
                worker_handles = handles;
            }
            Err(e) => {
                tracing::warn!(error = %e, "inline workers failed to start");
            }
        }
    }

    let state = AppState::build(cfg.clone(), pool, cache, events);
    let router = routes::build_router(state);

    let bind_addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%bind_addr, "starting clipfeed");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| error::AppError::StartServer(format!("bind {bind_addr}: {e}")))?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await
        .map_err(|e| error::AppError::StartServer(format!("serve: {e}")))?;

    for handle in worker_handles {
        let _ = handle.await;
    }
    Ok(())
}
