//! TOML configuration file loading

use std::net::IpAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::builder::ConfigBuilder;
use crate::Result;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./tenant-gate.toml",
    "~/.config/tenant-gate/config.toml",
    "/etc/tenant-gate/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    Ok(apply_file_config(builder, file_config))
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> ConfigBuilder {
    if let Some(db) = config.database {
        if let Some(url) = db.url {
            builder = builder.database_url(url);
        }

        if let Some(size) = db.pool_size
            && let Some(nz) = NonZeroUsize::new(size)
        {
            builder = builder.pool_size(nz);
        }

        if let Some(secs) = db.query_timeout_secs
            && secs > 0
        {
            builder = builder.query_timeout(Duration::from_secs(secs));
        }
    }

    if let Some(server) = config.server {
        if let Some(host_str) = server.http_host
            && let Ok(host) = host_str.parse::<IpAddr>()
        {
            builder = builder.http_host(host);
        }

        if let Some(port) = server.http_port {
            builder = builder.http_port(port);
        }

        if let Some(secs) = server.request_timeout_secs
            && secs > 0
        {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
    }

    if let Some(rl) = config.rate_limit {
        if let Some(limit) = rl.ip_limit
            && let Some(nz) = NonZeroU32::new(limit)
        {
            builder = builder.ip_rate_limit(nz);
        }

        if let Some(secs) = rl.ip_window_secs
            && secs > 0
        {
            builder = builder.ip_rate_window(Duration::from_secs(secs));
        }

        if let Some(secs) = rl.sweep_interval_secs
            && secs > 0
        {
            builder = builder.sweep_interval(Duration::from_secs(secs));
        }
    }

    if let Some(auth) = config.auth {
        if let Some(secret) = auth.jwt_secret {
            builder = builder.jwt_secret(secret);
        }

        if let Some(issuer) = auth.jwt_issuer {
            builder = builder.jwt_issuer(issuer);
        }

        if let Some(secs) = auth.clock_skew_secs {
            builder = builder.clock_skew(Duration::from_secs(secs));
        }
    }

    if let Some(obs) = config.observability {
        if let Some(level) = obs.log_level {
            builder = builder.log_level(level);
        }

        if let Some(json) = obs.json_logs {
            builder = builder.json_logs(json);
        }
    }

    builder
}

#[derive(Debug, Deserialize)]
struct FileConfig {
    database: Option<DatabaseSection>,
    server: Option<ServerSection>,
    rate_limit: Option<RateLimitSection>,
    auth: Option<AuthSection>,
    observability: Option<ObservabilitySection>,
}

#[derive(Debug, Deserialize)]
struct DatabaseSection {
    url: Option<String>,
    pool_size: Option<usize>,
    query_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    http_host: Option<String>,
    http_port: Option<u16>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RateLimitSection {
    ip_limit: Option<u32>,
    ip_window_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AuthSection {
    jwt_secret: Option<String>,
    jwt_issuer: Option<String>,
    clock_skew_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ObservabilitySection {
    log_level: Option<String>,
    json_logs: Option<bool>,
}
