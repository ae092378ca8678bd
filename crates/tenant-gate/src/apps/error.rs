//! App directory errors

use thiserror::Error;

use crate::error::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("app name is required")]
    NameRequired,

    #[error("rate limit values must be non-negative")]
    InvalidRateLimit,

    #[error("owner user does not exist")]
    OwnerNotFound,

    #[error("app not found")]
    NotFound,

    #[error(transparent)]
    Store(#[from] Error),
}

impl AppError {
    /// Caller mistakes, safe to report verbatim
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::NameRequired | Self::InvalidRateLimit)
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::OwnerNotFound)
    }

    #[must_use]
    pub const fn is_store(&self) -> bool {
        matches!(self, Self::Store(_))
    }
}

impl From<tokio_postgres::Error> for AppError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Store(err.into())
    }
}

pub type AppResult<T> = std::result::Result<T, AppError>;
