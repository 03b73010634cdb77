//! Rate Limit Middleware
//!
//! One stage of the limiter pipeline. The router installs one stage per
//! enabled scope, each with its own [`RateLimitState`].

use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use crate::application::evaluator::RateLimitEvaluator;
use crate::application::observer::{NoopObserver, Outcome, RateLimitObserver};
use crate::domain::decision::RateLimitDecision;
use crate::domain::key::derive_key;
use crate::domain::repository::CounterStore;
use crate::domain::scope::RateLimitScope;
use platform::rate_limit::RateLimitPolicy;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Body of a 429 response.
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded";

/// Middleware state
pub struct RateLimitState<S>
where
    S: CounterStore + Send + Sync + 'static,
{
    pub evaluator: Arc<RateLimitEvaluator<S>>,
    pub scope: RateLimitScope,
    pub policy: RateLimitPolicy,
    pub observer: Arc<dyn RateLimitObserver>,
}

impl<S> RateLimitState<S>
where
    S: CounterStore + Send + Sync + 'static,
{
    pub fn new(
        evaluator: Arc<RateLimitEvaluator<S>>,
        scope: RateLimitScope,
        policy: RateLimitPolicy,
    ) -> Self {
        Self {
            evaluator,
            scope,
            policy,
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn RateLimitObserver>) -> Self {
        self.observer = observer;
        self
    }
}

impl<S> Clone for RateLimitState<S>
where
    S: CounterStore + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            evaluator: self.evaluator.clone(),
            scope: self.scope,
            policy: self.policy,
            observer: self.observer.clone(),
        }
    }
}

/// Count the request against this stage's bucket.
///
/// - Key or store failure: logged, request passes without rate-limit headers
/// - Over the limit: 429 with `Retry-After` and the rate-limit headers
/// - Otherwise: the downstream response, carrying the rate-limit headers
///   unless an inner stage already set them
pub async fn enforce_rate_limit<S>(
    State(state): State<RateLimitState<S>>,
    req: Request<Body>,
    next: Next,
) -> Response
where
    S: CounterStore + Send + Sync + 'static,
{
    let key = match derive_key(state.scope, &req) {
        Ok(key) => key,
        Err(e) => {
            e.log(None);
            state.observer.on_decision(state.scope, Outcome::Bypassed);
            return next.run(req).await;
        }
    };

    let decision = match state
        .evaluator
        .check_limit(&key, state.policy.max_requests, state.policy.window)
        .await
    {
        Ok(decision) => decision,
        Err(e) => {
            e.log(Some(key.as_str()));
            state.observer.on_decision(state.scope, Outcome::Bypassed);
            return next.run(req).await;
        }
    };

    if !decision.allowed {
        tracing::debug!(
            scope = %state.scope,
            key = %key,
            count = decision.current_count,
            limit = state.policy.max_requests,
            "Rate limit exceeded"
        );
        state.observer.on_decision(state.scope, Outcome::Denied);
        return rate_limited_response(&state.policy, &decision);
    }

    state.observer.on_decision(state.scope, Outcome::Allowed);

    let mut response = next.run(req).await;
    apply_headers(
        response.headers_mut(),
        state.policy.max_requests,
        &decision,
        false,
    );
    response
}

fn rate_limited_response(policy: &RateLimitPolicy, decision: &RateLimitDecision) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        RATE_LIMITED_MESSAGE,
    )
        .into_response();

    let headers = response.headers_mut();
    apply_headers(headers, policy.max_requests, decision, true);
    headers.insert(header::RETRY_AFTER, HeaderValue::from(policy.window_secs()));
    response
}

fn apply_headers(
    headers: &mut HeaderMap,
    limit: u32,
    decision: &RateLimitDecision,
    overwrite: bool,
) {
    let values = [
        (X_RATELIMIT_LIMIT, HeaderValue::from(limit)),
        (X_RATELIMIT_REMAINING, HeaderValue::from(decision.remaining)),
        (X_RATELIMIT_RESET, HeaderValue::from(decision.reset_unix())),
    ];

    for (name, value) in values {
        if overwrite || !headers.contains_key(&name) {
            headers.insert(name, value);
        }
    }
}
