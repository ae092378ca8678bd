//! Bearer token validation settings

use std::time::Duration;

/// HS256/384/512 validation settings
#[derive(Clone)]
pub struct JwtConfig {
    /// Shared signing secret
    pub hs_secret: String,
    /// Expected `iss` claim; not checked when unset
    pub issuer: Option<String>,
    /// Clock skew tolerance for exp validation
    pub clock_skew: Duration,
}

// hs_secret is never printed
impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("issuer", &self.issuer)
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

impl JwtConfig {
    #[must_use]
    pub fn new(hs_secret: impl Into<String>) -> Self {
        Self {
            hs_secret: hs_secret.into(),
            issuer: None,
            clock_skew: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    #[must_use]
    pub const fn with_clock_skew(mut self, skew: Duration) -> Self {
        self.clock_skew = skew;
        self
    }
}
