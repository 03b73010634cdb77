//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use anyhow::Context;
use api::config::{AppConfig, StoreBackend};
use api::handlers::SystemState;
use api::metrics::Metrics;
use api::server::{AppContext, build_router};
use auth::JwtService;
use rate_limit::{
    CounterStore, MemoryCounterStore, PgCounterStore, RateLimitEvaluator, RedisCounterStore,
};
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("Failed to load configuration")?;

    // Initialize tracing; RUST_LOG wins over the config file
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.logger.level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.jwt.uses_default_secret() {
        tracing::warn!("JWT secret is the built-in default; set JWT_SECRET in production");
    }
    config.server.rate_limit.warn_unknown_scopes();

    let db = connect_database(&config).await?;
    let redis = connect_redis(&config).await?;

    let metrics = Arc::new(Metrics::new().context("Failed to register metrics")?);
    let tokens = Arc::new(JwtService::new(config.jwt.clone()));
    let system = SystemState {
        metrics,
        db: db.clone(),
        redis: redis.clone(),
    };

    match config.server.rate_limit.backend {
        StoreBackend::Redis => {
            let conn = redis.context("Redis backend selected but Redis is unavailable")?;
            serve(config, RedisCounterStore::new(conn), tokens, system).await
        }
        StoreBackend::Postgres => {
            let pool = db.context("Postgres backend selected but DATABASE_URL is not set")?;
            let store = PgCounterStore::new(pool);

            // Errors here should not prevent server startup
            match store.cleanup_expired().await {
                Ok(deleted) => {
                    tracing::info!(buckets_deleted = deleted, "Rate limit bucket cleanup completed")
                }
                Err(e) => tracing::warn!(
                    error = %e,
                    "Rate limit bucket cleanup failed, continuing anyway"
                ),
            }
            serve(config, store, tokens, system).await
        }
        StoreBackend::Memory => {
            tracing::warn!("In-process rate limit store; limits are not shared between instances");
            serve(config, MemoryCounterStore::new(), tokens, system).await
        }
    }
}

async fn connect_database(config: &AppConfig) -> anyhow::Result<Option<PgPool>> {
    let Some(url) = config.database.url.as_deref() else {
        tracing::info!("DATABASE_URL not set, running without a database");
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    Ok(Some(pool))
}

/// Redis is mandatory only when it backs the rate limiter.
async fn connect_redis(config: &AppConfig) -> anyhow::Result<Option<ConnectionManager>> {
    let required = config.server.rate_limit.backend == StoreBackend::Redis;

    let connected: redis::RedisResult<ConnectionManager> = async {
        let client = redis::Client::open(config.redis.url.as_str())?;
        ConnectionManager::new(client).await
    }
    .await;

    match connected {
        Ok(conn) => {
            tracing::info!("Connected to Redis");
            Ok(Some(conn))
        }
        Err(e) if required => Err(e).context("Failed to connect to Redis"),
        Err(e) => {
            tracing::warn!(error = %e, "Redis unavailable, health will report it down");
            Ok(None)
        }
    }
}

async fn serve<S>(
    config: AppConfig,
    store: S,
    tokens: Arc<JwtService>,
    system: SystemState,
) -> anyhow::Result<()>
where
    S: CounterStore + Send + Sync + 'static,
{
    let server = config.server;
    let evaluator = Arc::new(
        RateLimitEvaluator::new(Arc::new(store))
            .with_store_timeout(server.rate_limit.store_timeout()),
    );
    let bind_address = server.bind_address();
    let grace = server.shutdown_grace();

    let app = build_router(AppContext {
        server,
        evaluator,
        tokens,
        system,
    });

    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    tracing::info!("Listening on {}", bind_address);

    let (stopping_tx, mut stopping_rx) = watch::channel(false);
    let serving = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown_signal().await;
        let _ = stopping_tx.send(true);
    })
    .into_future();

    let deadline = async move {
        if stopping_rx.wait_for(|stopping| *stopping).await.is_err() {
            return std::future::pending().await;
        }
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = serving => result?,
        _ = deadline => {
            tracing::warn!(grace_secs = grace.as_secs(), "Shutdown grace period elapsed, dropping open connections");
        }
    }

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
