//! Prometheus metrics
//!
//! All collectors live on one isolated [`Registry`] owned by [`Metrics`], so
//! tests can build as many instances as they like.
//!
//! ## Metrics Provided
//!
//! - `http_requests_total{method,path,status}`
//! - `http_request_duration_seconds{method,path,status}`
//! - `http_request_size_bytes{method,path}`
//! - `http_response_size_bytes{method,path,status}`
//! - `http_requests_in_flight`
//! - `rate_limit_decisions_total{scope,outcome}`
//! - `auth_rejections_total{reason}`

use auth::{AuthObserver, RejectReason};
use axum::body::{Body, HttpBody};
use axum::extract::{MatchedPath, State};
use axum::http::{Request, header};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    Encoder, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder, exponential_buckets,
    histogram_opts, opts,
};
use rate_limit::{Outcome, RateLimitObserver, RateLimitScope};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Path label for requests that matched no route.
pub const UNMATCHED_PATH: &str = "unmatched";

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration: HistogramVec,
    request_size: HistogramVec,
    response_size: HistogramVec,
    requests_in_flight: IntGauge,
    rate_limit_decisions: IntCounterVec,
    auth_rejections: IntCounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        let size_buckets = exponential_buckets(100.0, 10.0, 8)?;

        let requests_total = IntCounterVec::new(
            opts!("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )?;

        let request_duration = HistogramVec::new(
            histogram_opts!(
                "http_request_duration_seconds",
                "Duration of HTTP requests in seconds"
            ),
            &["method", "path", "status"],
        )?;

        let request_size = HistogramVec::new(
            histogram_opts!(
                "http_request_size_bytes",
                "Size of HTTP requests in bytes",
                size_buckets.clone()
            ),
            &["method", "path"],
        )?;

        let response_size = HistogramVec::new(
            histogram_opts!(
                "http_response_size_bytes",
                "Size of HTTP responses in bytes",
                size_buckets
            ),
            &["method", "path", "status"],
        )?;

        let requests_in_flight = IntGauge::with_opts(opts!(
            "http_requests_in_flight",
            "Number of HTTP requests currently being processed"
        ))?;

        let rate_limit_decisions = IntCounterVec::new(
            opts!(
                "rate_limit_decisions_total",
                "Rate limiter decisions by scope and outcome"
            ),
            &["scope", "outcome"],
        )?;

        let auth_rejections = IntCounterVec::new(
            opts!(
                "auth_rejections_total",
                "Rejected authentication attempts by reason"
            ),
            &["reason"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration.clone()))?;
        registry.register(Box::new(request_size.clone()))?;
        registry.register(Box::new(response_size.clone()))?;
        registry.register(Box::new(requests_in_flight.clone()))?;
        registry.register(Box::new(rate_limit_decisions.clone()))?;
        registry.register(Box::new(auth_rejections.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration,
            request_size,
            response_size,
            requests_in_flight,
            rate_limit_decisions,
            auth_rejections,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Current values in the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

impl RateLimitObserver for Metrics {
    fn on_decision(&self, scope: RateLimitScope, outcome: Outcome) {
        self.rate_limit_decisions
            .with_label_values(&[scope.code(), outcome.code()])
            .inc();
    }
}

impl AuthObserver for Metrics {
    fn on_rejection(&self, reason: RejectReason) {
        self.auth_rejections
            .with_label_values(&[reason.to_string().as_str()])
            .inc();
    }
}

/// Middleware state
#[derive(Clone)]
pub struct HttpMetricsState {
    pub metrics: Arc<Metrics>,
    pub enabled: bool,
    /// Raw request paths that are never recorded
    pub skip_paths: Arc<HashSet<String>>,
}

impl HttpMetricsState {
    pub fn new(metrics: Arc<Metrics>, metrics_path: &str, exclude_paths: &[String]) -> Self {
        let mut skip_paths: HashSet<String> = exclude_paths.iter().cloned().collect();
        skip_paths.insert(metrics_path.to_string());

        Self {
            metrics,
            enabled: true,
            skip_paths: Arc::new(skip_paths),
        }
    }

    /// Keep the layer installed but record nothing when `false`.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Middleware recording request count, latency, sizes and concurrency
pub async fn track_http_metrics(
    State(state): State<HttpMetricsState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled || state.skip_paths.contains(req.uri().path()) {
        return next.run(req).await;
    }

    let method = req.method().to_string();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_PATH.to_string());
    let request_bytes = content_length(req.headers()).unwrap_or(0);

    let metrics = &state.metrics;
    metrics.requests_in_flight.inc();
    let start = Instant::now();

    let response = next.run(req).await;

    let elapsed = start.elapsed().as_secs_f64();
    metrics.requests_in_flight.dec();

    let status = response.status().as_u16().to_string();
    let response_bytes = content_length(response.headers())
        .or_else(|| response.body().size_hint().exact())
        .unwrap_or(0);

    let labels = [method.as_str(), path.as_str(), status.as_str()];
    metrics.requests_total.with_label_values(&labels).inc();
    metrics
        .request_duration
        .with_label_values(&labels)
        .observe(elapsed);
    metrics
        .response_size
        .with_label_values(&labels)
        .observe(response_bytes as f64);
    metrics
        .request_size
        .with_label_values(&[method.as_str(), path.as_str()])
        .observe(request_bytes as f64);

    response
}

fn content_length(headers: &axum::http::HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
