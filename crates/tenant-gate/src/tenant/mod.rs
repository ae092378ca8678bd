//! Tenant isolation through transaction-scoped session state
//!
//! Row-level security policies on tenant tables read the caller's identity
//! from `request.jwt.claim.*` settings. [`bind_claims`] sets them, together
//! with the `authenticated` role, for the current transaction only.

mod binder;
mod escape;

pub use binder::{SessionExecutor, bind_claims, session_statements};
pub use escape::{quote_identifier, quote_literal};
