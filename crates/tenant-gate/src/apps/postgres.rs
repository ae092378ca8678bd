//! PostgreSQL app store
//!
//! Every operation runs in its own transaction with the caller's claims bound
//! first, so row-level security policies on `apps` and `api_keys` decide what
//! the caller may see and change.

use async_trait::async_trait;
use tokio_postgres::Row;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use super::error::{AppError, AppResult};
use super::model::{App, AppInput, PageRequest};
use super::store::AppStore;
use crate::auth::Claims;
use crate::error::Error;
use crate::pool::Pool;
use crate::tenant::bind_claims;

const APP_COLUMNS: &str = "id, name, description, owner_user_id, rate_limit_rps, \
     rate_limit_window_seconds, created_at, updated_at";

const REVOKE_APP_KEYS: &str = "UPDATE api_keys \
     SET revoked_at = COALESCE(revoked_at, now()), app_id = NULL \
     WHERE app_id = $1";

const DELETE_APP: &str = "DELETE FROM apps WHERE id = $1";

#[derive(Debug, Clone)]
pub struct PgAppStore {
    pool: Pool,
}

impl PgAppStore {
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AppStore for PgAppStore {
    async fn insert(
        &self,
        claims: Option<&Claims>,
        owner: Uuid,
        input: &AppInput,
    ) -> AppResult<App> {
        let mut conn = self.pool.get().await.map_err(Error::from)?;
        let tx = conn.transaction().await?;
        bind_claims(&tx, claims).await?;

        let sql = format!(
            "INSERT INTO apps (name, description, owner_user_id, rate_limit_rps, \
             rate_limit_window_seconds) VALUES ($1, $2, $3, $4, $5) RETURNING {APP_COLUMNS}"
        );
        let row = tx
            .query_one(
                &sql,
                &[
                    &input.name,
                    &input.description,
                    &owner,
                    &input.rate_limit_rps,
                    &input.rate_limit_window_seconds,
                ],
            )
            .await
            .map_err(|e| {
                let err = Error::from(e);
                if err.sql_state() == Some(&SqlState::FOREIGN_KEY_VIOLATION) {
                    AppError::OwnerNotFound
                } else {
                    err.into()
                }
            })?;
        let app = app_from_row(&row)?;

        tx.commit().await?;
        Ok(app)
    }

    async fn fetch(&self, claims: Option<&Claims>, id: Uuid) -> AppResult<Option<App>> {
        let mut conn = self.pool.get().await.map_err(Error::from)?;
        let tx = conn.transaction().await?;
        bind_claims(&tx, claims).await?;

        let sql = format!("SELECT {APP_COLUMNS} FROM apps WHERE id = $1");
        let app = tx
            .query_opt(&sql, &[&id])
            .await?
            .as_ref()
            .map(app_from_row)
            .transpose()?;

        tx.commit().await?;
        Ok(app)
    }

    async fn list(&self, claims: Option<&Claims>, page: PageRequest) -> AppResult<(Vec<App>, u64)> {
        let mut conn = self.pool.get().await.map_err(Error::from)?;
        let tx = conn.transaction().await?;
        bind_claims(&tx, claims).await?;

        let total: i64 = tx.query_one("SELECT count(*) FROM apps", &[]).await?.try_get(0)?;

        let sql = format!(
            "SELECT {APP_COLUMNS} FROM apps ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"
        );
        let limit = page.limit() as i64;
        let offset = page.offset() as i64;
        let items = tx
            .query(&sql, &[&limit, &offset])
            .await?
            .iter()
            .map(app_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tx.commit().await?;
        Ok((items, total.max(0) as u64))
    }

    async fn update(
        &self,
        claims: Option<&Claims>,
        id: Uuid,
        input: &AppInput,
    ) -> AppResult<Option<App>> {
        let mut conn = self.pool.get().await.map_err(Error::from)?;
        let tx = conn.transaction().await?;
        bind_claims(&tx, claims).await?;

        let sql = format!(
            "UPDATE apps SET name = $2, description = $3, rate_limit_rps = $4, \
             rate_limit_window_seconds = $5, updated_at = now() \
             WHERE id = $1 RETURNING {APP_COLUMNS}"
        );
        let app = tx
            .query_opt(
                &sql,
                &[
                    &id,
                    &input.name,
                    &input.description,
                    &input.rate_limit_rps,
                    &input.rate_limit_window_seconds,
                ],
            )
            .await?
            .as_ref()
            .map(app_from_row)
            .transpose()?;

        tx.commit().await?;
        Ok(app)
    }

    async fn delete_cascade(&self, claims: Option<&Claims>, id: Uuid) -> AppResult<bool> {
        let mut conn = self.pool.get().await.map_err(Error::from)?;
        let tx = conn.transaction().await?;
        bind_claims(&tx, claims).await?;

        // Key inserts referencing the app hold a FOR KEY SHARE lock on its
        // row, so the DELETE below waits for any racing insert to finish.
        let revoked = tx.execute(REVOKE_APP_KEYS, &[&id]).await?;
        let deleted = tx.execute(DELETE_APP, &[&id]).await?;

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        tracing::debug!(app_id = %id, revoked_keys = revoked, "App deleted");
        Ok(true)
    }
}

fn app_from_row(row: &Row) -> Result<App, Error> {
    Ok(App {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        owner_user_id: row.try_get("owner_user_id")?,
        rate_limit_rps: row.try_get("rate_limit_rps")?,
        rate_limit_window_seconds: row.try_get("rate_limit_window_seconds")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
