//! Configuration management
//!
//! Supports configuration loading with precedence: env > file > CLI > defaults

mod builder;
mod env;
mod file;

pub use builder::{
    AuthConfig, Config, ConfigBuilder, RateLimitConfig, ServerConfig, TelemetryConfig,
};
pub use env::vars;

use crate::Result;

/// Layer the first config file found and then the environment over `base`
pub fn load_config(base: ConfigBuilder) -> Result<ConfigBuilder> {
    let mut builder = base;

    if let Some(path) = file::find_config_file() {
        tracing::info!("Loading configuration from {}", path.display());
        builder = file::load_from_file(&path, builder)?;
    }

    Ok(env::load_from_env(builder))
}

/// Layer a specific config file and then the environment over `base`
pub fn load_config_from_path(path: &std::path::Path, base: ConfigBuilder) -> Result<ConfigBuilder> {
    let builder = file::load_from_file(path, base)?;
    Ok(env::load_from_env(builder))
}
