//! JWT parsing and validation

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode_header};

use super::claims::Claims;
use super::config::JwtConfig;
use super::error::{AuthError, Result};

const HS_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Validates HMAC-signed bearer tokens
pub struct JwtValidator {
    config: JwtConfig,
    key: DecodingKey,
}

impl std::fmt::Debug for JwtValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtValidator")
            .field("issuer", &self.config.issuer)
            .finish_non_exhaustive()
    }
}

impl JwtValidator {
    pub fn new(config: JwtConfig) -> Result<Self> {
        if config.hs_secret.is_empty() {
            return Err(AuthError::Config("HS secret must not be empty".into()));
        }
        let key = DecodingKey::from_secret(config.hs_secret.as_bytes());
        Ok(Self { config, key })
    }

    pub fn validate(&self, token: &str) -> Result<Claims> {
        let header = decode_header(token).map_err(|_| AuthError::InvalidToken)?;
        if !HS_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::UnsupportedAlgorithm);
        }

        let mut validation = Validation::new(header.alg);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = self.config.clock_skew.as_secs();
        validation.validate_aud = false;

        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer.trim_end_matches('/')]);
        }

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.key, &validation)?;
        Ok(token_data.claims)
    }
}
