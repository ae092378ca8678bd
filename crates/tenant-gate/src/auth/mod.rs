//! Bearer-token authentication
//!
//! Validates HS256/384/512 JWTs with `jsonwebtoken` and exposes the decoded
//! [`Claims`] to downstream middlewares (tenant rate limiting) and handlers
//! (tenant isolation binding).

mod claims;
mod config;
mod error;
mod jwt;
mod middleware;

pub use claims::{AppQuota, Claims};
pub use config::JwtConfig;
pub use error::{AuthError, Result};
pub use jwt::JwtValidator;
pub use middleware::{AuthState, optional_claims_middleware};
