//! Bearer token validation errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid issuer")]
    InvalidIssuer,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::TokenExpired,
            ErrorKind::InvalidIssuer => Self::InvalidIssuer,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidAlgorithm => Self::UnsupportedAlgorithm,
            _ => Self::InvalidToken,
        }
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
