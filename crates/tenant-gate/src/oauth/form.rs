//! `application/x-www-form-urlencoded` request parsing

use std::borrow::Cow;

use axum::http::{HeaderMap, header};
use percent_encoding::percent_decode_str;

use super::types::OAuthError;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Require a form content type; parameters such as `charset` are allowed
pub fn require_form_content_type(headers: &HeaderMap) -> Result<(), OAuthError> {
    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(str::trim);

    match media_type {
        Some(m) if m.eq_ignore_ascii_case(FORM_CONTENT_TYPE) => Ok(()),
        _ => Err(OAuthError::invalid_request(
            "content type must be application/x-www-form-urlencoded",
        )),
    }
}

/// Decoded form parameters in body order; repeated names are kept
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormParams {
    pairs: Vec<(String, String)>,
}

impl FormParams {
    /// Decode a form body.
    ///
    /// Rejects bodies that are not UTF-8, contain a `%` not followed by two
    /// hex digits, or percent-decode to invalid UTF-8.
    pub fn parse(body: &[u8]) -> Result<Self, OAuthError> {
        let text = std::str::from_utf8(body)
            .map_err(|_| OAuthError::invalid_request("request body is not valid UTF-8"))?;

        if !has_valid_escapes(text) {
            return Err(OAuthError::invalid_request(
                "malformed percent-encoding in request body",
            ));
        }

        let pairs = text
            .split('&')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                let (name, value) = segment.split_once('=').unwrap_or((segment, ""));
                Ok::<_, OAuthError>((decode_component(name)?, decode_component(value)?))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { pairs })
    }

    /// First value for `name`, possibly empty
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First value for `name` if it is non-empty
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).filter(|v| !v.is_empty())
    }

    /// True when `name` carries a non-empty value
    pub fn is_present(&self, name: &str) -> bool {
        self.non_empty(name).is_some()
    }

    /// Every value for `name` in body order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.pairs
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// `+` is a space; percent escapes must decode to UTF-8
fn decode_component(raw: &str) -> Result<String, OAuthError> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|_| OAuthError::invalid_request("request body is not valid UTF-8"))
}

fn has_valid_escapes(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return false;
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    true
}
