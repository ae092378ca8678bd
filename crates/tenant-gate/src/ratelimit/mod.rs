//! Request rate limiting
//!
//! One fixed-window engine ([`RateLimiter`]) backs two independent instances:
//! a network limiter keyed by client address with a single configured quota,
//! and a tenant limiter keyed by app id with the quota taken from each
//! request's [`Claims`](crate::auth::Claims). Counters are process-local.

mod client_ip;
mod limiter;
mod middleware;

pub use client_ip::{UNKNOWN_CLIENT, is_private_or_loopback, resolve_client_key};
pub use limiter::{Decision, RateLimiter};
pub use middleware::{AppRateLimitState, IpRateLimitState, app_rate_limit, ip_rate_limit};
