//! Prometheus metrics for tenant-gate

use std::sync::OnceLock;
use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::Result;
use crate::error::Error;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
static START_TIME: OnceLock<Instant> = OnceLock::new();

// Server metrics
const METRIC_UPTIME: &str = "tenant_gate_uptime_seconds";
const METRIC_INFO: &str = "tenant_gate_info";

// Rate limiting
const METRIC_RATE_LIMIT_DECISIONS: &str = "tenant_gate_rate_limit_decisions_total";
const METRIC_RATE_LIMIT_BUCKETS: &str = "tenant_gate_rate_limit_buckets";

// OAuth
const METRIC_TOKEN_REQUESTS: &str = "tenant_gate_token_requests_total";

// App directory
const METRIC_APP_OPERATIONS: &str = "tenant_gate_app_operations_total";

/// Initialize Prometheus metrics recorder.
pub fn init_metrics() -> Result<()> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| Error::Config(format!("Failed to install metrics recorder: {e}")))?;

    PROMETHEUS_HANDLE.set(handle).ok();
    START_TIME.set(Instant::now()).ok();

    register_metrics();
    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

fn register_metrics() {
    describe_gauge!(METRIC_UPTIME, "Server uptime in seconds");
    describe_gauge!(METRIC_INFO, "Server information (always 1)");

    describe_counter!(
        METRIC_RATE_LIMIT_DECISIONS,
        "Rate limit decisions by limiter and outcome"
    );
    describe_gauge!(
        METRIC_RATE_LIMIT_BUCKETS,
        "Buckets currently tracked by each limiter"
    );

    describe_counter!(METRIC_TOKEN_REQUESTS, "Token endpoint requests by outcome");
    describe_counter!(
        METRIC_APP_OPERATIONS,
        "App directory operations by operation and outcome"
    );

    gauge!(
        METRIC_INFO,
        "version" => env!("CARGO_PKG_VERSION"),
    )
    .set(1.0);
}

/// Render metrics in Prometheus text format.
#[must_use]
pub fn render_metrics() -> String {
    if let Some(start) = START_TIME.get() {
        gauge!(METRIC_UPTIME).set(start.elapsed().as_secs_f64());
    }

    PROMETHEUS_HANDLE
        .get()
        .map(PrometheusHandle::render)
        .unwrap_or_default()
}

/// Record one limiter decision.
pub fn record_rate_limit_decision(limiter: &str, allowed: bool) {
    counter!(
        METRIC_RATE_LIMIT_DECISIONS,
        "limiter" => limiter.to_owned(),
        "outcome" => if allowed { "allowed" } else { "denied" },
    )
    .increment(1);
}

pub fn set_rate_limit_buckets(limiter: &'static str, buckets: usize) {
    gauge!(METRIC_RATE_LIMIT_BUCKETS, "limiter" => limiter).set(buckets as f64);
}

/// Record a token request; `outcome` is `ok` or the OAuth error code.
pub fn record_token_request(outcome: &str) {
    counter!(METRIC_TOKEN_REQUESTS, "outcome" => outcome.to_owned()).increment(1);
}

pub fn record_app_operation(operation: &'static str, outcome: &str) {
    counter!(
        METRIC_APP_OPERATIONS,
        "operation" => operation,
        "outcome" => outcome.to_owned(),
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_functions_without_recorder() {
        record_rate_limit_decision("ip", true);
        record_rate_limit_decision("app", false);
        set_rate_limit_buckets("ip", 3);
        record_token_request("ok");
        record_token_request("invalid_client");
        record_app_operation("create", "ok");
    }

    #[test]
    fn test_render_metrics_before_init() {
        // Only empty when no other test installed the recorder first
        let output = render_metrics();
        if PROMETHEUS_HANDLE.get().is_none() {
            assert!(output.is_empty());
        }
    }
}
