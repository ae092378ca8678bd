//! Rate limiting middlewares for the HTTP surface

use std::net::SocketAddr;
use std::time::Duration;

use axum::Json;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use super::client_ip::resolve_client_key;
use super::limiter::{Decision, RateLimiter};
use crate::auth::Claims;
use crate::constants::headers;

/// Header triple reported for one limiter
#[derive(Debug, Clone, Copy)]
struct HeaderNames {
    limit: &'static str,
    remaining: &'static str,
    reset: &'static str,
}

const IP_HEADERS: HeaderNames = HeaderNames {
    limit: headers::RATE_LIMIT_LIMIT,
    remaining: headers::RATE_LIMIT_REMAINING,
    reset: headers::RATE_LIMIT_RESET,
};

const APP_HEADERS: HeaderNames = HeaderNames {
    limit: headers::APP_RATE_LIMIT_LIMIT,
    remaining: headers::APP_RATE_LIMIT_REMAINING,
    reset: headers::APP_RATE_LIMIT_RESET,
};

/// State for [`ip_rate_limit`]: one limit shared by every network client
#[derive(Debug, Clone)]
pub struct IpRateLimitState {
    pub limiter: RateLimiter,
    pub limit: u32,
    pub window: Duration,
}

impl IpRateLimitState {
    #[must_use]
    pub const fn new(limiter: RateLimiter, limit: u32, window: Duration) -> Self {
        Self {
            limiter,
            limit,
            window,
        }
    }
}

/// State for [`app_rate_limit`]: limits come from each request's claims
#[derive(Debug, Clone)]
pub struct AppRateLimitState {
    pub limiter: RateLimiter,
}

impl AppRateLimitState {
    #[must_use]
    pub const fn new(limiter: RateLimiter) -> Self {
        Self { limiter }
    }
}

/// Limit requests per client network address
pub async fn ip_rate_limit(
    State(state): State<IpRateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key = resolve_client_key(remote, request.headers());

    let decision = state.limiter.allow(&key, state.limit, state.window);
    record_decision(&state.limiter, &decision);

    if !decision.allowed {
        tracing::info!(client = %key, limit = state.limit, "Client rate limit exceeded");
        return too_many_requests(&decision, IP_HEADERS);
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &decision, IP_HEADERS);
    response
}

/// Limit requests per tenant using the quota carried in [`Claims`].
///
/// Anonymous requests, tokens without an app, and unmetered apps pass through
/// untouched.
pub async fn app_rate_limit(
    State(state): State<AppRateLimitState>,
    request: Request,
    next: Next,
) -> Response {
    let decision = request
        .extensions()
        .get::<Claims>()
        .and_then(Claims::app_quota)
        .map(|quota| {
            let decision = state.limiter.allow(quota.app_id, quota.limit, quota.window);
            if !decision.allowed {
                tracing::info!(app_id = quota.app_id, limit = quota.limit, "App rate limit exceeded");
            }
            decision
        });

    let Some(decision) = decision else {
        return next.run(request).await;
    };
    record_decision(&state.limiter, &decision);

    if !decision.allowed {
        return too_many_requests(&decision, APP_HEADERS);
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &decision, APP_HEADERS);
    response
}

fn too_many_requests(decision: &Decision, names: HeaderNames) -> Response {
    let retry_after = decision.retry_after_secs();
    let body = json!({
        "error": "rate_limit_exceeded",
        "error_description": format!("Too many requests, retry after {retry_after} seconds"),
    });

    let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
    let headers = response.headers_mut();
    apply_headers(headers, decision, names);
    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
    response
}

fn apply_headers(headers: &mut HeaderMap, decision: &Decision, names: HeaderNames) {
    headers.insert(
        HeaderName::from_static(names.limit),
        HeaderValue::from(decision.limit),
    );
    headers.insert(
        HeaderName::from_static(names.remaining),
        HeaderValue::from(decision.remaining),
    );
    headers.insert(
        HeaderName::from_static(names.reset),
        HeaderValue::from(decision.reset_epoch_secs()),
    );
}

#[cfg_attr(
    not(feature = "metrics"),
    allow(unused_variables, clippy::missing_const_for_fn)
)]
fn record_decision(limiter: &RateLimiter, decision: &Decision) {
    #[cfg(feature = "metrics")]
    crate::observability::record_rate_limit_decision(limiter.name(), decision.allowed);
}
