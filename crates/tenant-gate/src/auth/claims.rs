//! Validated identity carried through a request

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::DEFAULT_APP_WINDOW_SECS;

/// Identity attached to a request once its bearer token has been validated.
///
/// Inserted into request extensions by the auth middleware and never mutated
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: String,
    #[serde(default)]
    pub email: String,
    /// Tenant (app) the token was issued for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// Requests allowed per window for the app; zero means unmetered
    #[serde(default)]
    pub app_rate_limit_rps: u32,
    /// Window length in seconds; zero means the 60 second default
    #[serde(default)]
    pub app_rate_limit_window: u64,
    #[serde(default)]
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Per-tenant quota derived from [`Claims`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppQuota<'a> {
    pub app_id: &'a str,
    pub limit: u32,
    pub window: Duration,
}

impl Claims {
    #[must_use]
    pub fn new(sub: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: email.into(),
            app_id: None,
            app_rate_limit_rps: 0,
            app_rate_limit_window: 0,
            exp: 0,
            iat: None,
        }
    }

    #[must_use]
    pub fn with_app(mut self, app_id: impl Into<String>, rps: u32, window_secs: u64) -> Self {
        self.app_id = Some(app_id.into());
        self.app_rate_limit_rps = rps;
        self.app_rate_limit_window = window_secs;
        self
    }

    /// Quota the tenant limiter should enforce, if any.
    ///
    /// `None` when the token carries no app or the app is unmetered.
    pub fn app_quota(&self) -> Option<AppQuota<'_>> {
        let app_id = self.app_id.as_deref().filter(|id| !id.is_empty())?;
        if self.app_rate_limit_rps == 0 {
            return None;
        }
        let window_secs = if self.app_rate_limit_window == 0 {
            DEFAULT_APP_WINDOW_SECS
        } else {
            self.app_rate_limit_window
        };
        Some(AppQuota {
            app_id,
            limit: self.app_rate_limit_rps,
            window: Duration::from_secs(window_secs),
        })
    }

    /// Subject parsed as a user id
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_claims() {
        let json = r#"{"sub": "user123", "exp": 1700000000}"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        assert_eq!(claims.sub, "user123");
        assert!(claims.email.is_empty());
        assert!(claims.app_id.is_none());
        assert!(claims.app_quota().is_none());
    }

    #[test]
    fn test_deserialize_app_claims() {
        let json = r#"{
            "sub": "user123",
            "email": "a@example.com",
            "app_id": "app-1",
            "app_rate_limit_rps": 10,
            "app_rate_limit_window": 30,
            "exp": 1700000000
        }"#;
        let claims: Claims = serde_json::from_str(json).unwrap();
        let quota = claims.app_quota().unwrap();
        assert_eq!(quota.app_id, "app-1");
        assert_eq!(quota.limit, 10);
        assert_eq!(quota.window, Duration::from_secs(30));
    }

    #[test]
    fn test_zero_rps_is_unmetered() {
        let claims = Claims::new("u", "e").with_app("app-1", 0, 30);
        assert!(claims.app_quota().is_none());
    }

    #[test]
    fn test_zero_window_defaults_to_a_minute() {
        let claims = Claims::new("u", "e").with_app("app-1", 5, 0);
        assert_eq!(claims.app_quota().unwrap().window, Duration::from_secs(60));
    }

    #[test]
    fn test_empty_app_id_has_no_quota() {
        let claims = Claims::new("u", "e").with_app("", 5, 10);
        assert!(claims.app_quota().is_none());
    }

    #[test]
    fn test_user_id() {
        let id = Uuid::new_v4();
        assert_eq!(Claims::new(id.to_string(), "e").user_id(), Some(id));
        assert_eq!(Claims::new("not-a-uuid", "e").user_id(), None);
    }
}
