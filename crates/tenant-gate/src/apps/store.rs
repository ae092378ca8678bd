//! Persistence seam for the app directory

use async_trait::async_trait;
use uuid::Uuid;

use super::error::AppResult;
use super::model::{App, AppInput, PageRequest};
use crate::auth::Claims;

/// Storage backend for apps.
///
/// Inputs arrive already validated. Each method is one atomic unit: a
/// failure leaves no partial writes behind. `claims` identify the caller for
/// row-level security and may be absent.
#[async_trait]
pub trait AppStore: Send + Sync {
    /// Fails with `OwnerNotFound` when `owner` is not a known user
    async fn insert(&self, claims: Option<&Claims>, owner: Uuid, input: &AppInput)
    -> AppResult<App>;

    async fn fetch(&self, claims: Option<&Claims>, id: Uuid) -> AppResult<Option<App>>;

    /// One page of apps, newest first, plus the total count
    async fn list(&self, claims: Option<&Claims>, page: PageRequest) -> AppResult<(Vec<App>, u64)>;

    async fn update(
        &self,
        claims: Option<&Claims>,
        id: Uuid,
        input: &AppInput,
    ) -> AppResult<Option<App>>;

    /// Revoke and detach the app's API keys, then remove the app.
    ///
    /// Returns `false`, with nothing changed, when the app does not exist.
    async fn delete_cascade(&self, claims: Option<&Claims>, id: Uuid) -> AppResult<bool>;
}
