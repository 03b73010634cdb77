//! System handlers: liveness, dependency health and metrics exposition.

use axum::Json;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use kernel::error::app_error::AppError;
use redis::aio::ConnectionManager;
use serde::Serialize;
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics::Metrics;

/// Upper bound for each dependency probe.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared state for system handlers
#[derive(Clone)]
pub struct SystemState {
    pub metrics: Arc<Metrics>,
    pub db: Option<PgPool>,
    pub redis: Option<ConnectionManager>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub timestamp: DateTime<Utc>,
    pub services: ServiceHealth,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub database: bool,
    pub redis: bool,
}

/// GET /status
pub async fn status() -> Json<Map<String, Value>> {
    Json(Map::new())
}

/// GET /health
///
/// Always 200; a failed probe shows up as `false`.
pub async fn health(State(state): State<SystemState>) -> Json<HealthResponse> {
    let (database, redis) = tokio::join!(
        probe_database(state.db.as_ref()),
        probe_redis(state.redis.clone())
    );

    Json(HealthResponse {
        timestamp: Utc::now(),
        services: ServiceHealth { database, redis },
    })
}

/// GET /metrics
pub async fn metrics(State(state): State<SystemState>) -> Response {
    match state.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => AppError::internal("Failed to encode metrics")
            .with_source(e)
            .into_response(),
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> AppError {
    AppError::not_found("Resource not found")
}

async fn probe_database(db: Option<&PgPool>) -> bool {
    let Some(pool) = db else {
        tracing::debug!("Database not configured, reporting unhealthy");
        return false;
    };

    let probe = sqlx::query("SELECT 1").execute(pool);
    match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Database health check failed");
            false
        }
        Err(_) => {
            tracing::error!("Database health check timed out");
            false
        }
    }
}

async fn probe_redis(conn: Option<ConnectionManager>) -> bool {
    let Some(mut conn) = conn else {
        tracing::debug!("Redis not configured, reporting unhealthy");
        return false;
    };

    let probe = async move {
        let pong: redis::RedisResult<String> = redis::cmd("PING").query_async(&mut conn).await;
        pong
    };
    match tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Redis health check failed");
            false
        }
        Err(_) => {
            tracing::error!("Redis health check timed out");
            false
        }
    }
}
