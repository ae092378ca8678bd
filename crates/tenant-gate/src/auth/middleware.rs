//! Optional bearer-token middleware
//!
//! Attaches [`Claims`] to the request when a valid bearer token is present.
//! Requests without an `Authorization` header pass through anonymously;
//! handlers and later middlewares treat the absent identity as a normal case.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;

use super::claims::Claims;
use super::jwt::JwtValidator;

/// Authentication state for middleware
#[derive(Clone, Default)]
pub struct AuthState {
    pub jwt_validator: Option<Arc<JwtValidator>>,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("has_jwt_validator", &self.jwt_validator.is_some())
            .finish()
    }
}

impl AuthState {
    #[must_use]
    pub fn new(jwt_validator: Option<Arc<JwtValidator>>) -> Self {
        Self { jwt_validator }
    }
}

/// Validate an optional bearer token and attach its claims
pub async fn optional_claims_middleware(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(validator) = state.jwt_validator.as_deref() else {
        return Ok(next.run(request).await);
    };

    if let Some(claims) = bearer_claims(&request, validator)? {
        tracing::debug!(sub = %claims.sub, app_id = ?claims.app_id, "Request authenticated");
        request.extensions_mut().insert(claims);
    }

    Ok(next.run(request).await)
}

fn bearer_claims(request: &Request, validator: &JwtValidator) -> Result<Option<Claims>, StatusCode> {
    let Some(value) = request.headers().get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| {
        tracing::warn!("Non-ASCII Authorization header");
        StatusCode::UNAUTHORIZED
    })?;

    let token = match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => {
            tracing::warn!("Invalid Authorization header format");
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    validator.validate(token).map(Some).map_err(|e| {
        // token contents stay out of the logs
        tracing::warn!(reason = %e, "JWT validation failed");
        StatusCode::UNAUTHORIZED
    })
}
