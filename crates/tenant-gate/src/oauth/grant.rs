//! Grant types accepted by the token endpoint

use std::fmt;

use super::form::FormParams;
use super::types::{OAuthClient, OAuthError};

/// Value of the `grant_type` parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    AuthorizationCode,
    ClientCredentials,
    RefreshToken,
}

impl GrantType {
    /// Parse the `grant_type` parameter.
    ///
    /// A missing value is `invalid_request`, an unknown one
    /// `unsupported_grant_type`.
    pub fn from_form(form: &FormParams) -> Result<Self, OAuthError> {
        let value = form
            .non_empty("grant_type")
            .ok_or_else(|| OAuthError::invalid_request("grant_type is required"))?;

        match value {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "client_credentials" => Ok(Self::ClientCredentials),
            "refresh_token" => Ok(Self::RefreshToken),
            other => Err(OAuthError::unsupported_grant_type(format!(
                "unsupported grant_type: {other}"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated grant, ready to hand to its collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenGrant {
    AuthorizationCode {
        code: String,
        redirect_uri: String,
        code_verifier: String,
    },
    ClientCredentials {
        scopes: Vec<String>,
        allowed_tables: Vec<String>,
    },
    RefreshToken {
        refresh_token: String,
    },
}

impl TokenGrant {
    /// Validate the grant-specific parameters for an authenticated client
    pub fn from_form(
        grant_type: GrantType,
        form: &FormParams,
        client: &OAuthClient,
    ) -> Result<Self, OAuthError> {
        match grant_type {
            GrantType::AuthorizationCode => Ok(Self::AuthorizationCode {
                code: required(form, "code")?,
                redirect_uri: required(form, "redirect_uri")?,
                code_verifier: required(form, "code_verifier")?,
            }),
            GrantType::ClientCredentials => client_credentials(form, client),
            GrantType::RefreshToken => Ok(Self::RefreshToken {
                refresh_token: required(form, "refresh_token")?,
            }),
        }
    }
}

fn client_credentials(form: &FormParams, client: &OAuthClient) -> Result<TokenGrant, OAuthError> {
    if !client.is_confidential() {
        return Err(OAuthError::unauthorized_client(
            "client_credentials grant requires a confidential client",
        ));
    }

    let scopes: Vec<String> = form
        .get("scope")
        .unwrap_or_default()
        .split(' ')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if scopes.is_empty() {
        return Err(OAuthError::invalid_request("scope is required"));
    }

    if let Some(denied) = scopes.iter().find(|s| !client.allows_scope(s)) {
        return Err(OAuthError::invalid_scope(format!(
            "scope not allowed for client: {denied}"
        )));
    }

    let allowed_tables = form
        .get_all("allowed_tables")
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    Ok(TokenGrant::ClientCredentials {
        scopes,
        allowed_tables,
    })
}

fn required(form: &FormParams, name: &str) -> Result<String, OAuthError> {
    form.non_empty(name)
        .map(str::to_string)
        .ok_or_else(|| OAuthError::invalid_request(format!("{name} is required")))
}
