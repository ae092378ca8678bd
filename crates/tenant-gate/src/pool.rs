use std::time::Duration;

use deadpool::managed::{self, Metrics, RecycleError, RecycleResult};
use tokio_postgres::{Client, NoTls};

use crate::constants::HEALTH_CHECK_QUERY;
use crate::{Error, Result};

pub type Pool = managed::Pool<ConnectionManager>;
pub type PooledConnection = managed::Object<ConnectionManager>;

#[derive(Debug)]
pub struct ConnectionManager {
    config: tokio_postgres::Config,
}

impl ConnectionManager {
    pub const fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }
}

impl managed::Manager for ConnectionManager {
    type Type = Client;
    type Error = tokio_postgres::Error;

    async fn create(&self) -> std::result::Result<Client, tokio_postgres::Error> {
        let (client, connection) = self.config.connect(NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "Database connection closed with error");
            }
        });
        Ok(client)
    }

    async fn recycle(&self, conn: &mut Client, _: &Metrics) -> RecycleResult<Self::Error> {
        // A closed client cannot be reused; other failures surface on the next query.
        if conn.is_closed() {
            return Err(RecycleError::Message("connection closed".into()));
        }
        Ok(())
    }
}

/// Build a pool for `url`; no connection is opened until first use
pub fn create_pool(url: &str, max_size: usize) -> Result<Pool> {
    let config: tokio_postgres::Config = url
        .parse()
        .map_err(|e| Error::Config(format!("Invalid database URL: {e}")))?;

    Pool::builder(ConnectionManager::new(config))
        .max_size(max_size)
        .runtime(deadpool::Runtime::Tokio1)
        .wait_timeout(Some(Duration::from_secs(10)))
        .create_timeout(Some(Duration::from_secs(30)))
        .recycle_timeout(Some(Duration::from_secs(5)))
        .build()
        .map_err(|e| Error::Pool(e.to_string()))
}

/// Run a trivial query on a pooled connection
pub async fn check_health(pool: &Pool) -> Result<()> {
    let conn = pool.get().await?;
    conn.simple_query(HEALTH_CHECK_QUERY).await?;
    Ok(())
}
