//! OAuth2 token endpoint (RFC 6749 section 3.2)
//!
//! Only the exchange logic lives here: client authentication, grant type
//! dispatch, PKCE parameter enforcement and scope confinement. Credential
//! checks and token minting are delegated to the traits in [`provider`].
//!
//! Supported grants: `authorization_code` (with PKCE `code_verifier`),
//! `client_credentials` (confidential clients only) and `refresh_token`.

mod client_auth;
mod endpoint;
mod form;
mod grant;
pub mod provider;
mod types;

pub use client_auth::{AuthMethod, ClientCredentials, extract_client_credentials};
pub use endpoint::{TokenEndpoint, token_handler};
pub use form::{FormParams, require_form_content_type};
pub use grant::{GrantType, TokenGrant};
pub use provider::{
    AuthorizationCodeExchanger, ClientAuthenticator, ClientCredentialsIssuer, ProviderError,
    ProviderResult, RefreshTokenRotator,
};
pub use types::{ClientType, ErrorCode, OAuthClient, OAuthError, TokenResponse};
