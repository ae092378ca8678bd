//! `POST /oauth/token`

use std::sync::Arc;

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};

use super::client_auth::extract_client_credentials;
use super::form::{FormParams, require_form_content_type};
use super::grant::{GrantType, TokenGrant};
use super::provider::{
    AuthorizationCodeExchanger, ClientAuthenticator, ClientCredentialsIssuer, ProviderError,
    RefreshTokenRotator,
};
use super::types::{ErrorCode, OAuthError, TokenResponse};
use crate::constants::MAX_FORM_BODY_BYTES;

/// Token exchange controller.
///
/// Each call is one pass through content-type check, body decoding, grant
/// type parsing, client authentication, client validation and grant dispatch.
/// Any failing step ends the request with an [`OAuthError`].
#[derive(Clone)]
pub struct TokenEndpoint {
    authenticator: Arc<dyn ClientAuthenticator>,
    code_exchanger: Arc<dyn AuthorizationCodeExchanger>,
    credentials_issuer: Arc<dyn ClientCredentialsIssuer>,
    refresh_rotator: Arc<dyn RefreshTokenRotator>,
}

impl std::fmt::Debug for TokenEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenEndpoint").finish_non_exhaustive()
    }
}

impl TokenEndpoint {
    #[must_use]
    pub fn new(
        authenticator: Arc<dyn ClientAuthenticator>,
        code_exchanger: Arc<dyn AuthorizationCodeExchanger>,
        credentials_issuer: Arc<dyn ClientCredentialsIssuer>,
        refresh_rotator: Arc<dyn RefreshTokenRotator>,
    ) -> Self {
        Self {
            authenticator,
            code_exchanger,
            credentials_issuer,
            refresh_rotator,
        }
    }

    /// Run one token exchange over already-read request parts
    pub async fn exchange(
        &self,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<TokenResponse, OAuthError> {
        require_form_content_type(headers)?;
        let form = FormParams::parse(body)?;
        let grant_type = GrantType::from_form(&form)?;
        let credentials = extract_client_credentials(headers, &form)?;

        let client_id = credentials.client_id.as_str();
        let fail = |err: ProviderError| normalize(err, client_id, grant_type);

        let client = self
            .authenticator
            .authenticate(client_id, &credentials.client_secret)
            .await
            .map_err(fail)?;

        let grant = TokenGrant::from_form(grant_type, &form, &client)?;

        let response = match grant {
            TokenGrant::AuthorizationCode {
                code,
                redirect_uri,
                code_verifier,
            } => {
                self.code_exchanger
                    .exchange_code(&client, &code, &redirect_uri, &code_verifier)
                    .await
            }
            TokenGrant::ClientCredentials {
                scopes,
                allowed_tables,
            } => {
                self.credentials_issuer
                    .issue(&client, &scopes, &allowed_tables)
                    .await
            }
            TokenGrant::RefreshToken { refresh_token } => {
                self.refresh_rotator
                    .rotate(&client.client_id, &refresh_token)
                    .await
            }
        }
        .map_err(fail)?;

        tracing::info!(client_id, grant_type = %grant_type, "Token issued");
        Ok(response)
    }
}

fn normalize(err: ProviderError, client_id: &str, grant_type: GrantType) -> OAuthError {
    match err {
        ProviderError::OAuth(e) => e,
        ProviderError::Internal(e) => {
            tracing::error!(
                client_id,
                grant_type = %grant_type,
                error = %format!("{e:#}"),
                "Token exchange failed"
            );
            OAuthError::server_error()
        }
    }
}

/// Axum handler for the token endpoint
pub async fn token_handler(State(endpoint): State<TokenEndpoint>, request: Request) -> Response {
    let (parts, body) = request.into_parts();

    if let Err(err) = require_form_content_type(&parts.headers) {
        return err.into_response();
    }

    let Ok(body) = axum::body::to_bytes(body, MAX_FORM_BODY_BYTES).await else {
        return OAuthError::invalid_request("request body is too large or unreadable")
            .into_response();
    };

    let result = endpoint.exchange(&parts.headers, &body).await;

    #[cfg(feature = "metrics")]
    crate::observability::record_token_request(
        result.as_ref().err().map_or("ok", |e| e.error.as_str()),
    );

    match result {
        Ok(token) => no_store(Json(token).into_response()),
        Err(err) => err.into_response(),
    }
}

impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let invalid_client = self.error == ErrorCode::InvalidClient;

        let mut response = no_store((status, Json(self)).into_response());
        if invalid_client {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Basic realm=\"token\""),
            );
        }
        response
    }
}

fn no_store(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}
