//! Environment variable loading for configuration

use std::env;
use std::net::IpAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

use super::builder::ConfigBuilder;

/// Environment variable names
pub mod vars {
    pub const DATABASE_URL: &str = "DATABASE_URL";
    pub const POOL_SIZE: &str = "TENANT_GATE_POOL_SIZE";
    pub const QUERY_TIMEOUT_SECS: &str = "TENANT_GATE_QUERY_TIMEOUT_SECS";
    pub const HTTP_HOST: &str = "TENANT_GATE_HTTP_HOST";
    pub const HTTP_PORT: &str = "TENANT_GATE_HTTP_PORT";
    pub const IP_RATE_LIMIT: &str = "TENANT_GATE_IP_RATE_LIMIT";
    pub const IP_RATE_WINDOW_SECS: &str = "TENANT_GATE_IP_RATE_WINDOW_SECS";
    pub const SWEEP_INTERVAL_SECS: &str = "TENANT_GATE_SWEEP_INTERVAL_SECS";
    pub const JWT_SECRET: &str = "TENANT_GATE_JWT_SECRET";
    pub const JWT_ISSUER: &str = "TENANT_GATE_JWT_ISSUER";
    pub const RUST_LOG: &str = "RUST_LOG";
    pub const JSON_LOGS: &str = "TENANT_GATE_JSON_LOGS";
}

/// Load configuration from environment variables.
///
/// Unparseable or zero values are ignored and leave the earlier layer in place.
pub fn load_from_env(mut builder: ConfigBuilder) -> ConfigBuilder {
    if let Ok(url) = env::var(vars::DATABASE_URL) {
        builder = builder.database_url(url);
    }

    if let Ok(size_str) = env::var(vars::POOL_SIZE)
        && let Ok(size) = size_str.parse::<usize>()
        && let Some(nz) = NonZeroUsize::new(size)
    {
        builder = builder.pool_size(nz);
    }

    if let Some(timeout) = secs_var(vars::QUERY_TIMEOUT_SECS) {
        builder = builder.query_timeout(timeout);
    }

    if let Ok(host_str) = env::var(vars::HTTP_HOST)
        && let Ok(host) = host_str.parse::<IpAddr>()
    {
        builder = builder.http_host(host);
    }

    if let Ok(port_str) = env::var(vars::HTTP_PORT)
        && let Ok(port) = port_str.parse::<u16>()
    {
        builder = builder.http_port(port);
    }

    if let Ok(limit_str) = env::var(vars::IP_RATE_LIMIT)
        && let Ok(limit) = limit_str.parse::<u32>()
        && let Some(nz) = NonZeroU32::new(limit)
    {
        builder = builder.ip_rate_limit(nz);
    }

    if let Some(window) = secs_var(vars::IP_RATE_WINDOW_SECS) {
        builder = builder.ip_rate_window(window);
    }

    if let Some(interval) = secs_var(vars::SWEEP_INTERVAL_SECS) {
        builder = builder.sweep_interval(interval);
    }

    if let Ok(secret) = env::var(vars::JWT_SECRET) {
        builder = builder.jwt_secret(secret);
    }

    if let Ok(issuer) = env::var(vars::JWT_ISSUER) {
        builder = builder.jwt_issuer(issuer);
    }

    if let Ok(level) = env::var(vars::RUST_LOG) {
        builder = builder.log_level(level);
    }

    if let Ok(val) = env::var(vars::JSON_LOGS) {
        builder = builder.json_logs(parse_bool(&val));
    }

    builder
}

fn secs_var(name: &str) -> Option<Duration> {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
