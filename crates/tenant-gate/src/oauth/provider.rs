//! Collaborators the token endpoint delegates to
//!
//! Credential storage, token signing and code bookkeeping live behind these
//! traits. Implementations return [`ProviderError::OAuth`] for conditions the
//! client should see and [`ProviderError::Internal`] for everything else.

use async_trait::async_trait;
use thiserror::Error;

use super::types::{OAuthClient, OAuthError, TokenResponse};

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Returned to the client unchanged
    #[error(transparent)]
    OAuth(#[from] OAuthError),

    /// Logged and reported to the client as `server_error`
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Verifies client credentials
#[async_trait]
pub trait ClientAuthenticator: Send + Sync {
    /// `client_secret` is empty for public clients
    async fn authenticate(&self, client_id: &str, client_secret: &str)
    -> ProviderResult<OAuthClient>;
}

/// Redeems authorization codes, verifying the PKCE code verifier
#[async_trait]
pub trait AuthorizationCodeExchanger: Send + Sync {
    async fn exchange_code(
        &self,
        client: &OAuthClient,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> ProviderResult<TokenResponse>;
}

/// Issues machine-to-machine tokens
#[async_trait]
pub trait ClientCredentialsIssuer: Send + Sync {
    /// `scopes` are already confined to the client's allowed scopes
    async fn issue(
        &self,
        client: &OAuthClient,
        scopes: &[String],
        allowed_tables: &[String],
    ) -> ProviderResult<TokenResponse>;
}

/// Rotates refresh tokens
#[async_trait]
pub trait RefreshTokenRotator: Send + Sync {
    async fn rotate(&self, client_id: &str, refresh_token: &str) -> ProviderResult<TokenResponse>;
}
