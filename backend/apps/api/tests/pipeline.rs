//! End-to-end tests of the assembled middleware pipeline, backed by the
//! in-process counter store.

use api::config::ServerConfig;
use api::handlers::SystemState;
use api::metrics::Metrics;
use api::server::{AppContext, build_router};
use auth::{JwtConfig, JwtService};
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use rate_limit::{MemoryCounterStore, RateLimitEvaluator};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    metrics: Arc<Metrics>,
    tokens: Arc<JwtService>,
}

fn server_config(overrides: &str) -> ServerConfig {
    serde_json::from_str(overrides).unwrap()
}

fn test_app(server: ServerConfig) -> TestApp {
    let metrics = Arc::new(Metrics::new().unwrap());
    let tokens = Arc::new(JwtService::new(JwtConfig::with_secret("pipeline-secret")));
    let evaluator = Arc::new(RateLimitEvaluator::new(Arc::new(MemoryCounterStore::new())));

    let router = build_router(AppContext {
        server,
        evaluator,
        tokens: tokens.clone(),
        system: SystemState {
            metrics: metrics.clone(),
            db: None,
            redis: None,
        },
    });

    TestApp {
        router,
        metrics,
        tokens,
    }
}

/// Two requests per minute per client, everything else default.
fn strict_app() -> TestApp {
    test_app(server_config(
        r#"{"rate_limit": {"backend": "memory", "ip": {"requests": 2, "window": 60}}}"#,
    ))
}

fn request(uri: &str, client: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client)
        .body(Body::empty())
        .unwrap()
}

fn authorized(uri: &str, client: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-forwarded-for", client)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn send(app: &TestApp, req: Request<Body>) -> Response {
    app.router.clone().oneshot(req).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_status_carries_ambient_headers() {
    let app = strict_app();

    let response = send(&app, request("/status", "10.0.0.1")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
    assert!(headers.contains_key("x-request-id"));
    assert_eq!(headers["x-ratelimit-limit"], "2");
    assert_eq!(headers["x-ratelimit-remaining"], "1");
    assert!(headers.contains_key("x-ratelimit-reset"));

    assert_eq!(body_text(response).await, "{}");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let app = strict_app();

    let mut req = request("/status", "10.0.0.1");
    req.headers_mut()
        .insert("x-request-id", "trace-123".parse().unwrap());

    let response = send(&app, req).await;
    assert_eq!(response.headers()["x-request-id"], "trace-123");
}

#[tokio::test]
async fn test_client_is_limited_independently() {
    let app = strict_app();

    for _ in 0..2 {
        let response = send(&app, request("/status", "10.0.0.1")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let denied = send(&app, request("/status", "10.0.0.1")).await;
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(denied.headers()[header::RETRY_AFTER], "60");
    assert_eq!(denied.headers()["x-ratelimit-remaining"], "0");
    assert_eq!(denied.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(body_text(denied).await, "Rate limit exceeded");

    let other = send(&app, request("/status", "10.0.0.2")).await;
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_runs_before_authentication() {
    let app = strict_app();

    for _ in 0..2 {
        let response = send(&app, request("/me", "10.0.0.3")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    let denied = send(&app, request("/me", "10.0.0.3")).await;
    assert_eq!(denied.status(), StatusCode::TOO_MANY_REQUESTS);

    let text = app.metrics.encode().unwrap();
    assert!(text.contains(r#"auth_rejections_total{reason="missing_header"} 2"#));
    assert!(text.contains(r#"rate_limit_decisions_total{outcome="denied",scope="ip"} 1"#));
}

#[tokio::test]
async fn test_me_with_valid_token() {
    let app = strict_app();
    let token = app
        .tokens
        .generate_access_token("user123", "user@example.com", "user")
        .unwrap();

    let response = send(&app, authorized("/me", "10.0.0.4", &token)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-limit"], "2");

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["userId"], "user123");
}

#[tokio::test]
async fn test_unauthorized_is_problem_json() {
    let app = strict_app();

    let response = send(&app, request("/me", "10.0.0.5")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["status"], 401);
    assert_eq!(body["detail"], "Unauthorized");
}

#[tokio::test]
async fn test_unknown_route_falls_back_to_404() {
    let app = strict_app();

    let response = send(&app, request("/nope", "10.0.0.6")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
}

#[tokio::test]
async fn test_health_reports_unconfigured_dependencies() {
    let app = strict_app();

    let response = send(&app, request("/health", "10.0.0.7")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body["services"]["database"], false);
    assert_eq!(body["services"]["redis"], false);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_metrics_endpoint_records_routes() {
    let app = test_app(server_config(r#"{"rate_limit": {"backend": "memory"}}"#));

    send(&app, request("/me", "10.0.0.8")).await;
    send(&app, request("/status", "10.0.0.8")).await;

    let response = send(&app, request("/metrics", "10.0.0.8")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4"
    );

    let text = body_text(response).await;
    assert!(text.contains(r#"http_requests_total{method="GET",path="/me",status="401"} 1"#));
    assert!(!text.contains(r#"path="/status""#));
    assert!(!text.contains(r#"path="/metrics""#));
    assert!(text.contains(r#"rate_limit_decisions_total{outcome="allowed",scope="ip"}"#));
}

#[tokio::test]
async fn test_metrics_disabled_hides_endpoint() {
    let app = test_app(server_config(
        r#"{"rate_limit": {"backend": "memory"}, "metrics": {"enabled": false}}"#,
    ));

    send(&app, request("/me", "10.0.0.9")).await;

    let response = send(&app, request("/metrics", "10.0.0.9")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let text = app.metrics.encode().unwrap();
    assert!(!text.contains("http_requests_total{"));
}

#[tokio::test]
async fn test_disabled_limiters_send_no_headers() {
    let app = test_app(server_config(
        r#"{"rate_limit": {"backend": "memory", "ip": {"enabled": false}}}"#,
    ));

    for _ in 0..5 {
        let response = send(&app, request("/status", "10.0.0.10")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("x-ratelimit-limit"));
    }
}

#[tokio::test]
async fn test_endpoint_limiter_headers_win_over_ip() {
    let app = test_app(server_config(
        r#"{"rate_limit": {
            "backend": "memory",
            "ip": {"requests": 100},
            "endpoint": {"enabled": true, "requests": 3}
        }}"#,
    ));

    let response = send(&app, request("/status", "10.0.0.11")).await;
    assert_eq!(response.headers()["x-ratelimit-limit"], "3");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "2");

    let other_path = send(&app, request("/health", "10.0.0.11")).await;
    assert_eq!(other_path.headers()["x-ratelimit-remaining"], "2");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let app = test_app(server_config(
        r#"{"max_request_size": 64, "rate_limit": {"backend": "memory"}}"#,
    ));

    let body = format!(r#"{{"refreshToken":"{}"}}"#, "a".repeat(256));
    let request = Request::builder()
        .method("POST")
        .uri("/auth/refresh")
        .header("x-forwarded-for", "10.0.0.12")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/problem+json"
    );
}

#[tokio::test]
async fn test_head_on_protected_route_requires_token() {
    let app = strict_app();

    let request = Request::builder()
        .method("HEAD")
        .uri("/me")
        .header("x-forwarded-for", "10.0.0.13")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let text = app.metrics.encode().unwrap();
    assert!(text.contains(r#"auth_rejections_total{reason="missing_header"} 1"#));
}
