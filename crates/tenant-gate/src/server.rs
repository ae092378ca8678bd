//! HTTP surface: router assembly and the serve loop

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
#[cfg(feature = "metrics")]
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::{Router, middleware};
use serde::Serialize;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::apps::{self, AppDirectory};
use crate::auth::{AuthState, optional_claims_middleware};
use crate::oauth::{TokenEndpoint, token_handler};
use crate::pool::{Pool, check_health};
use crate::ratelimit::{AppRateLimitState, IpRateLimitState, app_rate_limit, ip_rate_limit};
use crate::{Error, Result};

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Everything the router needs
#[derive(Debug, Clone)]
pub struct Gateway {
    pub directory: AppDirectory,
    pub auth: AuthState,
    pub ip_limit: IpRateLimitState,
    pub app_limit: AppRateLimitState,
    /// `POST /oauth/token` is only mounted when set
    pub token_endpoint: Option<TokenEndpoint>,
    /// Checked by `/health` when set
    pub pool: Option<Pool>,
    pub request_timeout: Duration,
}

/// Build the service router.
///
/// `/v1/apps` runs claims extraction, then the tenant limiter. Every API route
/// sits behind the network limiter; `/health` and `/metrics` are unthrottled.
pub fn build_router(gateway: Gateway) -> Router {
    let apps = apps::router(gateway.directory)
        .layer(middleware::from_fn_with_state(
            gateway.app_limit,
            app_rate_limit,
        ))
        .layer(middleware::from_fn_with_state(
            gateway.auth,
            optional_claims_middleware,
        ));

    let mut api = Router::new().merge(apps);
    if let Some(endpoint) = gateway.token_endpoint {
        api = api.merge(
            Router::new()
                .route("/oauth/token", post(token_handler))
                .with_state(endpoint),
        );
    }
    let api = api.layer(middleware::from_fn_with_state(
        gateway.ip_limit,
        ip_rate_limit,
    ));

    #[allow(unused_mut)]
    let mut ops = Router::new()
        .route("/health", get(health_handler))
        .with_state(gateway.pool);

    #[cfg(feature = "metrics")]
    {
        ops = ops.route("/metrics", get(metrics_handler));
    }

    Router::new()
        .merge(ops)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            gateway.request_timeout,
        ))
}

/// Bind and serve until `shutdown` resolves
pub async fn serve(
    router: Router,
    host: IpAddr,
    port: u16,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = SocketAddr::new(host, port);
    emit_bind_warnings(host);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Transport(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("HTTP server listening on {addr}");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .map_err(|e| Error::Transport(format!("HTTP server error: {e}")))?;

    tracing::info!("HTTP server shutdown complete");
    Ok(())
}

fn emit_bind_warnings(host: IpAddr) {
    if host == IpAddr::V4(Ipv4Addr::UNSPECIFIED) || host == IpAddr::V6(Ipv6Addr::UNSPECIFIED) {
        tracing::warn!(
            "HTTP server binding to all interfaces. \
             X-Forwarded-For is only trusted from private and loopback peers."
        );
    } else if !host.is_loopback() {
        tracing::warn!("HTTP server binding to non-loopback address ({host})");
    }
}

async fn health_handler(State(pool): State<Option<Pool>>) -> Response {
    if let Some(pool) = pool
        && let Err(e) = check_health(&pool).await
    {
        tracing::warn!(error = %e, "Database health check failed");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "unavailable",
                version: env!("CARGO_PKG_VERSION"),
            }),
        )
            .into_response();
    }

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
    .into_response()
}

#[cfg(feature = "metrics")]
async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        crate::observability::render_metrics(),
    )
}
