use std::sync::Arc;

use talent_engagement::{
    config::{Config, StoreBackend},
    create_router,
    db::{self, Cache, CacheWriterHandle},
    store::{EngagementStore, Fixture, MemoryStore, PgStore},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talent_engagement=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = build_store(&config).await?;
    let (cache, cache_writer) = connect_cache(&config).await;

    let state = Arc::new(AppState::new(store, cache, &config));
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(address = %address, backend = ?config.store_backend, "Server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(writer) = cache_writer {
        writer.shutdown().await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn EngagementStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let pool = db::create_pool(
                &config.database_url,
                config.db_max_connections,
                config.store_timeout(),
            )
            .await?;
            if config.run_migrations {
                db::postgres::run_migrations(&pool).await?;
            }
            Ok(Arc::new(PgStore::new(pool)))
        }
        StoreBackend::Memory => {
            let store = match &config.seed_file {
                Some(path) => {
                    let store = MemoryStore::from_fixture(Fixture::from_path(path)?).await;
                    tracing::info!(path = %path, "Loaded seed fixture");
                    store
                }
                None => MemoryStore::new(),
            };
            Ok(Arc::new(store))
        }
    }
}

/// Caching is optional; an unreachable Redis only disables it
async fn connect_cache(config: &Config) -> (Option<Cache>, Option<CacheWriterHandle>) {
    let Some(url) = config.redis_url() else {
        return (None, None);
    };

    let connected = match db::create_redis_client(url) {
        Ok(client) => Cache::new(client).await,
        Err(e) => Err(e),
    };

    match connected {
        Ok((cache, writer)) => (Some(cache), Some(writer)),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, caching disabled");
            (None, None)
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
