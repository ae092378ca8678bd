use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query timeout after {0:?}")]
    QueryTimeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl Error {
    #[must_use]
    pub const fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }

    #[must_use]
    pub const fn is_pool(&self) -> bool {
        matches!(self, Self::Pool(_))
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::QueryTimeout(_))
    }

    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// SQLSTATE of the underlying database error, if any
    #[must_use]
    pub fn sql_state(&self) -> Option<&tokio_postgres::error::SqlState> {
        match self {
            Self::Database(e) => e.code(),
            _ => None,
        }
    }
}

impl From<deadpool::managed::PoolError<tokio_postgres::Error>> for Error {
    fn from(err: deadpool::managed::PoolError<tokio_postgres::Error>) -> Self {
        match err {
            deadpool::managed::PoolError::Backend(e) => Self::Database(e),
            other => Self::Pool(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_predicate() {
        let err = Error::QueryTimeout(Duration::from_secs(30));
        assert!(err.is_timeout());
        assert!(!err.is_pool());
        assert!(!err.is_config());
    }

    #[test]
    fn test_pool_predicate() {
        let err = Error::Pool("timed out waiting for connection".to_string());
        assert!(err.is_pool());
        assert!(!err.is_database());
    }

    #[test]
    fn test_config_predicate() {
        let err = Error::Config("missing database url".to_string());
        assert!(err.is_config());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_transport_predicate() {
        let err = Error::Transport("address in use".to_string());
        assert!(err.is_transport());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_sql_state_absent_for_non_database_errors() {
        assert!(Error::Pool("closed".into()).sql_state().is_none());
        assert!(Error::QueryTimeout(Duration::from_secs(1)).sql_state().is_none());
    }

    #[test]
    fn test_error_display() {
        let err = Error::QueryTimeout(Duration::from_secs(30));
        assert!(err.to_string().contains("30"));

        let err = Error::Config("bad port".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad port");
    }

    #[test]
    fn test_pool_error_conversion() {
        let err: Error = deadpool::managed::PoolError::<tokio_postgres::Error>::Closed.into();
        assert!(err.is_pool());
    }
}
