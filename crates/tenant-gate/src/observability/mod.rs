//! Logging and optional Prometheus metrics

#[cfg(feature = "metrics")]
mod metrics;

#[cfg(feature = "metrics")]
pub use metrics::{
    init_metrics, record_app_operation, record_rate_limit_decision, record_token_request,
    render_metrics, set_rate_limit_buckets,
};

use crate::Result;
use crate::config::TelemetryConfig;

/// Initialize logging, plus the metrics recorder when built with `metrics`
pub fn init_observability(config: &TelemetryConfig) -> Result<()> {
    #[cfg(feature = "metrics")]
    {
        init_metrics()?;
    }

    init_logging(config)
}

fn init_logging(config: &TelemetryConfig) -> Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, Layer};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| {
            crate::Error::Config(format!("Invalid log level '{}': {e}", config.log_level))
        })?;

    let fmt_layer = if config.json_logs {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| crate::Error::Config(format!("Failed to install log subscriber: {e}")))
}
