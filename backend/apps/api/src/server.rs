//! Router and middleware pipeline
//!
//! Every request passes the stages below in this order; the order is
//! declared once, in [`build_router`]:
//!
//! 1. Request ID (generated when absent, echoed on the response)
//! 2. Panic recovery
//! 3. Security headers
//! 4. Body size limit
//! 5. Compression
//! 6. HTTP metrics
//! 7. Access log
//! 8. Request timeout (408)
//! 9. Global, per-IP and per-endpoint rate limiters (each only when enabled)
//! 10. CORS
//! 11. Authentication gate
//! 12. Handler

use auth::{AuthGateState, JwtService, auth_route_security, auth_router, authenticate};
use axum::Router;
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{
    Extensions, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Version, header,
};
use axum::middleware::{Next, from_fn, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use kernel::error::app_error::AppError;
use rate_limit::{
    CounterStore, RateLimitEvaluator, RateLimitScope, RateLimitState, enforce_rate_limit,
};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::CompressionLevel;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::compression::CompressionLayer;
use tower_http::compression::predicate::{DefaultPredicate, Predicate};
use tower_http::cors::{AllowOrigin, Any as AnyOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{CorsConfig, ServerConfig};
use crate::handlers::{self, SystemState};
use crate::metrics::{HttpMetricsState, track_http_metrics};

/// Everything the router needs, already connected.
pub struct AppContext<S>
where
    S: CounterStore + Send + Sync + 'static,
{
    pub server: ServerConfig,
    pub evaluator: Arc<RateLimitEvaluator<S>>,
    pub tokens: Arc<JwtService>,
    pub system: SystemState,
}

pub fn build_router<S>(ctx: AppContext<S>) -> Router
where
    S: CounterStore + Send + Sync + 'static,
{
    let AppContext {
        server,
        evaluator,
        tokens,
        system,
    } = ctx;
    let metrics = system.metrics.clone();

    let mut system_routes = Router::new()
        .route("/status", get(handlers::status))
        .route("/health", get(handlers::health));
    if server.metrics.enabled {
        system_routes = system_routes.route(&server.metrics.path, get(handlers::metrics));
    }

    let routes = system_routes
        .with_state(system)
        .merge(auth_router(tokens.clone()))
        .fallback(handlers::not_found);

    let limiter = |scope: RateLimitScope| {
        let policy = server.rate_limit.policy(scope);
        if !policy.enabled {
            return None;
        }

        tracing::info!(
            scope = %scope,
            requests = policy.max_requests,
            window_secs = policy.window_secs(),
            "Rate limiter enabled"
        );
        let state = RateLimitState::new(evaluator.clone(), scope, policy)
            .with_observer(metrics.clone());
        Some(from_fn_with_state(state, enforce_rate_limit::<S>))
    };
    let global_limiter = limiter(RateLimitScope::Global);
    let ip_limiter = limiter(RateLimitScope::PerClientIp);
    let endpoint_limiter = limiter(RateLimitScope::PerEndpoint);

    let http_metrics = HttpMetricsState::new(
        metrics.clone(),
        &server.metrics.path,
        &server.metrics.exclude_paths,
    )
    .enabled(server.metrics.enabled);

    let gate = AuthGateState::new(tokens, auth_route_security()).with_observer(metrics);

    let compression_enabled = server.compression.enabled;
    let compression = CompressionLayer::new()
        .quality(CompressionLevel::Precise(server.compression.level.clamp(1, 9) as i32))
        .compress_when(DefaultPredicate::new().and(
            move |_: StatusCode, _: Version, _: &HeaderMap, _: &Extensions| compression_enabled,
        ));

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(from_fn(security_headers))
        .layer(DefaultBodyLimit::max(server.max_request_size))
        .layer(compression)
        .layer(from_fn_with_state(http_metrics, track_http_metrics))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            server.request_timeout(),
        ))
        .option_layer(global_limiter)
        .option_layer(ip_limiter)
        .option_layer(endpoint_limiter)
        .layer(cors_layer(&server.cors))
        .layer(from_fn_with_state(gate, authenticate));

    routes.layer(middleware)
}

/// CORS policy from configuration.
///
/// A `*` origin allows any origin. Credentials are never combined with a
/// wildcard origin.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let wildcard = config.allowed_origins.iter().any(|o| o == "*");

    let origins = if wildcard {
        AllowOrigin::from(AnyOrigin)
    } else {
        AllowOrigin::list(
            config
                .allowed_origins
                .iter()
                .filter_map(|o| HeaderValue::from_str(o.trim()).ok()),
        )
    };

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| Method::from_bytes(m.trim().as_bytes()).ok())
        .collect();

    let headers = parse_header_names(&config.allowed_headers);
    let exposed = parse_header_names(&config.exposed_headers);

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers(headers)
        .expose_headers(exposed)
        .max_age(Duration::from_secs(config.max_age));

    if config.allow_credentials {
        if wildcard {
            tracing::warn!("CORS credentials ignored with wildcard origin");
        } else {
            cors = cors.allow_credentials(true);
        }
    }

    cors
}

fn parse_header_names(names: &[String]) -> Vec<HeaderName> {
    names
        .iter()
        .filter_map(|h| HeaderName::from_bytes(h.trim().as_bytes()).ok())
        .collect()
}

/// Middleware that adds browser hardening headers to every response
pub async fn security_headers(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    let values: [(HeaderName, &'static str); 7] = [
        (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
        (header::X_FRAME_OPTIONS, "DENY"),
        (header::X_XSS_PROTECTION, "1; mode=block"),
        (
            header::STRICT_TRANSPORT_SECURITY,
            "max-age=31536000; includeSubDomains",
        ),
        (header::REFERRER_POLICY, "strict-origin-when-cross-origin"),
        (header::X_DNS_PREFETCH_CONTROL, "off"),
        (
            HeaderName::from_static("permissions-policy"),
            "geolocation=(), microphone=(), camera=()",
        ),
    ];

    for (name, value) in values {
        headers
            .entry(name)
            .or_insert(HeaderValue::from_static(value));
    }

    response
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = detail, "Handler panicked");

    AppError::internal("Internal server error").into_response()
}
