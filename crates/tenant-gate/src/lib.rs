//! Rate limiting, OAuth2 token exchange and row-level tenant isolation for
//! multi-tenant HTTP services

pub mod apps;
pub mod auth;
pub mod config;
mod constants;
mod error;
pub mod oauth;
pub mod observability;
mod pool;
pub mod ratelimit;
pub mod server;
pub mod tenant;

pub use config::{Config, ConfigBuilder};
pub use error::{Error, Result};
pub use pool::{ConnectionManager, Pool, PooledConnection, check_health, create_pool};
pub use server::{Gateway, build_router, serve};
