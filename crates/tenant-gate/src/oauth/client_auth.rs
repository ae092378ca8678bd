//! Client credential extraction for the token endpoint

use axum::http::{HeaderMap, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::form::FormParams;
use super::types::OAuthError;

/// How the client presented its credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// HTTP Basic `Authorization` header
    ClientSecretBasic,
    /// `client_id` / `client_secret` form parameters
    ClientSecretPost,
}

/// Credentials presented by the client, not yet verified
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub method: AuthMethod,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Extract client credentials from exactly one authentication method.
///
/// An `Authorization: Basic` header wins whenever present, even when it is
/// malformed; body credentials sent alongside it are rejected rather than
/// silently ignored.
pub fn extract_client_credentials(
    headers: &HeaderMap,
    form: &FormParams,
) -> Result<ClientCredentials, OAuthError> {
    if let Some(encoded) = basic_credentials(headers) {
        if form.is_present("client_id") || form.is_present("client_secret") {
            return Err(OAuthError::invalid_request(
                "multiple client authentication methods are not allowed",
            ));
        }
        return decode_basic(encoded);
    }

    let client_id = form.get("client_id").map(str::trim).unwrap_or_default();
    if client_id.is_empty() {
        return Err(OAuthError::invalid_client("client authentication required"));
    }

    Ok(ClientCredentials {
        client_id: client_id.to_string(),
        client_secret: form.get("client_secret").unwrap_or_default().to_string(),
        method: AuthMethod::ClientSecretPost,
    })
}

/// Payload of an `Authorization` header using the Basic scheme, if any
fn basic_credentials(headers: &HeaderMap) -> Option<&[u8]> {
    let value = headers.get(header::AUTHORIZATION)?.as_bytes();
    let scheme = value.get(..6)?;
    scheme
        .eq_ignore_ascii_case(b"basic ")
        .then(|| value[6..].trim_ascii())
}

fn decode_basic(encoded: &[u8]) -> Result<ClientCredentials, OAuthError> {
    let malformed = || OAuthError::invalid_client("malformed basic authorization header");

    let decoded = STANDARD.decode(encoded).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (client_id, client_secret) = decoded.split_once(':').ok_or_else(malformed)?;

    if client_id.is_empty() {
        return Err(OAuthError::invalid_client("client_id is required"));
    }

    Ok(ClientCredentials {
        client_id: client_id.to_string(),
        client_secret: client_secret.to_string(),
        method: AuthMethod::ClientSecretBasic,
    })
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::oauth::ErrorCode;

    fn basic(user_pass: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let value = format!("Basic {}", STANDARD.encode(user_pass));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        headers
    }

    fn raw_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    fn form(body: &str) -> FormParams {
        FormParams::parse(body.as_bytes()).unwrap()
    }

    #[test]
    fn test_basic_credentials() {
        let creds = extract_client_credentials(&basic("client-1:s3cr:et"), &form("")).unwrap();
        assert_eq!(creds.client_id, "client-1");
        assert_eq!(creds.client_secret, "s3cr:et");
        assert_eq!(creds.method, AuthMethod::ClientSecretBasic);
    }

    #[test]
    fn test_basic_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        let value = format!("bAsIc {}", STANDARD.encode("c:s"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(&value).unwrap());
        let creds = extract_client_credentials(&headers, &form("")).unwrap();
        assert_eq!(creds.client_id, "c");
    }

    #[test]
    fn test_basic_with_body_credentials_is_rejected() {
        let err = extract_client_credentials(&basic("c:s"), &form("client_id=c")).unwrap_err();
        assert_eq!(err.error, ErrorCode::InvalidRequest);
        assert_eq!(
            err.error_description.as_deref(),
            Some("multiple client authentication methods are not allowed")
        );

        let err = extract_client_credentials(&basic("c:s"), &form("client_secret=x")).unwrap_err();
        assert_eq!(err.error, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_basic_with_empty_body_credentials_is_allowed() {
        let creds =
            extract_client_credentials(&basic("c:s"), &form("client_id=&client_secret=")).unwrap();
        assert_eq!(creds.client_id, "c");
    }

    #[test]
    fn test_malformed_basic_does_not_fall_back_to_body() {
        let err = extract_client_credentials(&raw_auth("Basic !!!not-base64"), &form("")).unwrap_err();
        assert_eq!(err.error, ErrorCode::InvalidClient);

        let err = extract_client_credentials(&raw_auth("Basic !!!"), &form("client_id=c"))
            .unwrap_err();
        assert_eq!(err.error, ErrorCode::InvalidRequest);
    }

    #[test]
    fn test_basic_empty_username_is_invalid_client() {
        let err = extract_client_credentials(&basic(":secret"), &form("")).unwrap_err();
        assert_eq!(err.error, ErrorCode::InvalidClient);
    }

    #[test]
    fn test_body_credentials() {
        let creds =
            extract_client_credentials(&HeaderMap::new(), &form("client_id=+app-1+&client_secret=x"))
                .unwrap();
        assert_eq!(creds.client_id, "app-1");
        assert_eq!(creds.client_secret, "x");
        assert_eq!(creds.method, AuthMethod::ClientSecretPost);
    }

    #[test]
    fn test_body_public_client_without_secret() {
        let creds = extract_client_credentials(&HeaderMap::new(), &form("client_id=spa")).unwrap();
        assert_eq!(creds.client_secret, "");
    }

    #[test]
    fn test_missing_client_id_is_invalid_client() {
        for body in ["", "client_id=", "client_id=+++", "client_secret=x"] {
            let err = extract_client_credentials(&HeaderMap::new(), &form(body)).unwrap_err();
            assert_eq!(err.error, ErrorCode::InvalidClient, "{body}");
        }
    }

    #[test]
    fn test_bearer_header_is_not_client_auth() {
        let creds =
            extract_client_credentials(&raw_auth("Bearer abc"), &form("client_id=c")).unwrap();
        assert_eq!(creds.method, AuthMethod::ClientSecretPost);
    }

    #[test]
    fn test_debug_hides_secret() {
        let creds = extract_client_credentials(&basic("c:topsecret"), &form("")).unwrap();
        assert!(!format!("{creds:?}").contains("topsecret"));
    }
}
