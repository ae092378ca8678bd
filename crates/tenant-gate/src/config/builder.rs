//! Configuration builder

use std::net::IpAddr;
use std::num::{NonZeroU32, NonZeroUsize};
use std::time::Duration;

use url::Url;

use crate::Error;
use crate::auth::JwtConfig;

/// Server configuration
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL URL; the app directory falls back to memory when unset
    pub database_url: Option<String>,
    pub pool_size: NonZeroUsize,
    pub query_timeout: Duration,
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
    pub telemetry: TelemetryConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field(
                "database_url",
                &self.database_url.as_deref().map(redact_url),
            )
            .field("pool_size", &self.pool_size)
            .field("query_timeout", &self.query_timeout)
            .field("server", &self.server)
            .field("rate_limit", &self.rate_limit)
            .field("auth", &self.auth)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

impl Config {
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        self.query_timeout
    }

    /// Bearer token validation settings, when a signing secret is configured
    #[must_use]
    pub fn jwt_config(&self) -> Option<JwtConfig> {
        let secret = self.auth.jwt_secret.as_deref()?;
        let mut config = JwtConfig::new(secret).with_clock_skew(self.auth.clock_skew);
        if let Some(issuer) = &self.auth.jwt_issuer {
            config = config.with_issuer(issuer.clone());
        }
        Some(config)
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_host: IpAddr,
    pub http_port: u16,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            http_port: 8080,
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Network-identity limiter settings
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub ip_limit: NonZeroU32,
    pub ip_window: Duration,
    /// How often stale buckets are evicted
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            ip_limit: ConfigBuilder::DEFAULT_IP_LIMIT,
            ip_window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Bearer token settings
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub jwt_issuer: Option<String>,
    pub clock_skew: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "***"))
            .field("jwt_issuer", &self.jwt_issuer)
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            jwt_issuer: None,
            clock_skew: Duration::from_secs(60),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    database_url: Option<String>,
    pool_size: NonZeroUsize,
    query_timeout: Duration,
    server: ServerConfig,
    rate_limit: RateLimitConfig,
    jwt_secret: Option<String>,
    jwt_issuer: Option<String>,
    clock_skew: Duration,
    log_level: Option<String>,
    json_logs: bool,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    const DEFAULT_POOL_SIZE: NonZeroUsize = NonZeroUsize::MIN.saturating_add(3); // 4
    const DEFAULT_IP_LIMIT: NonZeroU32 = NonZeroU32::MIN.saturating_add(99); // 100

    #[must_use]
    pub const fn new() -> Self {
        Self {
            database_url: None,
            pool_size: Self::DEFAULT_POOL_SIZE,
            query_timeout: Duration::from_secs(30),
            server: ServerConfig {
                http_host: IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
                http_port: 8080,
                request_timeout: Duration::from_secs(30),
            },
            rate_limit: RateLimitConfig {
                ip_limit: Self::DEFAULT_IP_LIMIT,
                ip_window: Duration::from_secs(60),
                sweep_interval: Duration::from_secs(60),
            },
            jwt_secret: None,
            jwt_issuer: None,
            clock_skew: Duration::from_secs(60),
            log_level: None,
            json_logs: false,
        }
    }

    #[must_use]
    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    #[must_use]
    pub const fn pool_size(mut self, size: NonZeroUsize) -> Self {
        self.pool_size = size;
        self
    }

    #[must_use]
    pub const fn query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn http_host(mut self, host: IpAddr) -> Self {
        self.server.http_host = host;
        self
    }

    #[must_use]
    pub const fn http_port(mut self, port: u16) -> Self {
        self.server.http_port = port;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.server.request_timeout = timeout;
        self
    }

    /// Requests allowed per client address in each window
    #[must_use]
    pub const fn ip_rate_limit(mut self, limit: NonZeroU32) -> Self {
        self.rate_limit.ip_limit = limit;
        self
    }

    #[must_use]
    pub const fn ip_rate_window(mut self, window: Duration) -> Self {
        self.rate_limit.ip_window = window;
        self
    }

    #[must_use]
    pub const fn sweep_interval(mut self, interval: Duration) -> Self {
        self.rate_limit.sweep_interval = interval;
        self
    }

    #[must_use]
    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    #[must_use]
    pub fn jwt_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.jwt_issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub const fn clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }

    #[must_use]
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    #[must_use]
    pub const fn json_logs(mut self, enabled: bool) -> Self {
        self.json_logs = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::Result<Config> {
        if self.rate_limit.ip_window.is_zero() {
            return Err(Error::Config("ip_window must be greater than zero".into()));
        }
        if self.rate_limit.sweep_interval.is_zero() {
            return Err(Error::Config(
                "sweep_interval must be greater than zero".into(),
            ));
        }
        if self.query_timeout.is_zero() {
            return Err(Error::Config(
                "query_timeout must be greater than zero".into(),
            ));
        }
        if self.jwt_secret.as_deref().is_some_and(str::is_empty) {
            return Err(Error::Config("jwt_secret must not be empty".into()));
        }

        let database_url = self.database_url.filter(|url| !url.trim().is_empty());

        let log_level = self
            .log_level
            .filter(|level| !level.is_empty())
            .unwrap_or_else(|| "info".to_string());

        Ok(Config {
            database_url,
            pool_size: self.pool_size,
            query_timeout: self.query_timeout,
            server: self.server,
            rate_limit: self.rate_limit,
            auth: AuthConfig {
                jwt_secret: self.jwt_secret,
                jwt_issuer: self.jwt_issuer,
                clock_skew: self.clock_skew,
            },
            telemetry: TelemetryConfig {
                log_level,
                json_logs: self.json_logs,
            },
        })
    }
}

/// Replace the password of a URL-form connection string for display
fn redact_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("***"));
            }
            url.to_string()
        }
        Err(_) => "<unparsed>".to_string(),
    }
}
