//! App directory service: validation and timeouts over an [`AppStore`]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::error::{AppError, AppResult};
use super::model::{App, AppInput, Page, PageRequest};
use super::store::AppStore;
use crate::auth::Claims;
use crate::error::Error;

#[derive(Clone)]
pub struct AppDirectory {
    store: Arc<dyn AppStore>,
    query_timeout: Duration,
}

impl std::fmt::Debug for AppDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppDirectory")
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

impl AppDirectory {
    #[must_use]
    pub fn new(store: Arc<dyn AppStore>, query_timeout: Duration) -> Self {
        Self {
            store,
            query_timeout,
        }
    }

    pub async fn create(
        &self,
        claims: Option<&Claims>,
        owner: Uuid,
        input: AppInput,
    ) -> AppResult<App> {
        let input = validate(input)?;
        let app = self
            .bounded("create", self.store.insert(claims, owner, &input))
            .await?;
        tracing::info!(app_id = %app.id, owner = %owner, "App created");
        Ok(app)
    }

    pub async fn get(&self, claims: Option<&Claims>, id: Uuid) -> AppResult<App> {
        self.bounded("get", self.store.fetch(claims, id))
            .await?
            .ok_or(AppError::NotFound)
    }

    pub async fn list(&self, claims: Option<&Claims>, page: PageRequest) -> AppResult<Page<App>> {
        let (items, total) = self.bounded("list", self.store.list(claims, page)).await?;
        Ok(Page::new(items, total, page))
    }

    pub async fn update(
        &self,
        claims: Option<&Claims>,
        id: Uuid,
        input: AppInput,
    ) -> AppResult<App> {
        let input = validate(input)?;
        let app = self
            .bounded("update", self.store.update(claims, id, &input))
            .await?
            .ok_or(AppError::NotFound)?;
        tracing::info!(app_id = %id, "App updated");
        Ok(app)
    }

    /// Delete an app, revoking and detaching its API keys in the same
    /// transaction
    pub async fn delete(&self, claims: Option<&Claims>, id: Uuid) -> AppResult<()> {
        if !self
            .bounded("delete", self.store.delete_cascade(claims, id))
            .await?
        {
            return Err(AppError::NotFound);
        }
        tracing::info!(app_id = %id, "App deleted");
        Ok(())
    }

    /// Run a store call under the query timeout; dropping the future on
    /// expiry cancels the in-flight query
    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let result = match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::QueryTimeout(self.query_timeout).into()),
        };

        #[cfg(feature = "metrics")]
        crate::observability::record_app_operation(
            operation,
            match &result {
                Ok(_) => "ok",
                Err(e) if e.is_store() => "error",
                Err(_) => "rejected",
            },
        );

        if let Err(AppError::Store(e)) = &result {
            tracing::error!(operation, error = %e, "App store operation failed");
        }
        result
    }
}

fn validate(mut input: AppInput) -> AppResult<AppInput> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(AppError::NameRequired);
    }
    if input.rate_limit_rps < 0 || input.rate_limit_window_seconds < 0 {
        return Err(AppError::InvalidRateLimit);
    }
    input.name = name.to_string();
    Ok(input)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::apps::MemoryAppStore;

    fn directory() -> (AppDirectory, Arc<MemoryAppStore>, Uuid) {
        let store = Arc::new(MemoryAppStore::new());
        let owner = Uuid::new_v4();
        store.add_user(owner);
        let directory = AppDirectory::new(store.clone(), Duration::from_secs(5));
        (directory, store, owner)
    }

    #[tokio::test]
    async fn test_create_trims_name() {
        let (directory, _, owner) = directory();
        let app = directory
            .create(None, owner, AppInput::new("  billing  ").with_rate_limit(10, 30))
            .await
            .unwrap();
        assert_eq!(app.name, "billing");
        assert_eq!(app.owner_user_id, owner);
        assert_eq!(app.rate_limit_rps, 10);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (directory, _, owner) = directory();

        let err = directory.create(None, owner, AppInput::new("   ")).await.unwrap_err();
        assert!(matches!(err, AppError::NameRequired));

        let err = directory
            .create(None, owner, AppInput::new("x").with_rate_limit(-1, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRateLimit));

        let err = directory
            .create(None, Uuid::new_v4(), AppInput::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OwnerNotFound));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (directory, _, _) = directory();
        let err = directory.get(None, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_list_empty_and_paged() {
        let (directory, _, owner) = directory();

        let page = directory.list(None, PageRequest::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);

        for i in 0..5 {
            directory
                .create(None, owner, AppInput::new(format!("app-{i}")))
                .await
                .unwrap();
        }
        let page = directory
            .list(None, PageRequest::new(Some(2), Some(2)))
            .await
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
    }

    #[tokio::test]
    async fn test_update() {
        let (directory, _, owner) = directory();
        let app = directory.create(None, owner, AppInput::new("old")).await.unwrap();

        let updated = directory
            .update(
                None,
                app.id,
                AppInput::new("new").with_description("d").with_rate_limit(5, 0),
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "new");
        assert_eq!(updated.description, "d");
        assert!(updated.updated_at >= app.updated_at);

        let err = directory
            .update(None, app.id, AppInput::new(""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NameRequired));

        let err = directory
            .update(None, app.id, AppInput::new("x").with_rate_limit(0, -5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRateLimit));

        let err = directory
            .update(None, Uuid::new_v4(), AppInput::new("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_delete_revokes_and_detaches_keys() {
        let (directory, store, owner) = directory();
        let app = directory.create(None, owner, AppInput::new("x")).await.unwrap();
        let keys = [
            store.insert_api_key(Some(app.id)).unwrap(),
            store.insert_api_key(Some(app.id)).unwrap(),
        ];
        let unrelated = store.insert_api_key(None).unwrap();

        directory.delete(None, app.id).await.unwrap();

        for key in keys {
            let record = store.api_key(key).unwrap();
            assert!(record.revoked_at.is_some());
            assert!(record.app_id.is_none());
        }
        assert!(store.api_key(unrelated).unwrap().revoked_at.is_none());
        assert!(matches!(
            directory.get(None, app.id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (directory, _, _) = directory();
        assert!(matches!(
            directory.delete(None, Uuid::new_v4()).await,
            Err(AppError::NotFound)
        ));
    }

    struct StalledStore;

    #[async_trait]
    impl AppStore for StalledStore {
        async fn insert(&self, _: Option<&Claims>, _: Uuid, _: &AppInput) -> AppResult<App> {
            std::future::pending().await
        }
        async fn fetch(&self, _: Option<&Claims>, _: Uuid) -> AppResult<Option<App>> {
            std::future::pending().await
        }
        async fn list(&self, _: Option<&Claims>, _: PageRequest) -> AppResult<(Vec<App>, u64)> {
            std::future::pending().await
        }
        async fn update(&self, _: Option<&Claims>, _: Uuid, _: &AppInput) -> AppResult<Option<App>> {
            std::future::pending().await
        }
        async fn delete_cascade(&self, _: Option<&Claims>, _: Uuid) -> AppResult<bool> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_stalled_store_times_out() {
        let directory = AppDirectory::new(Arc::new(StalledStore), Duration::from_millis(20));
        let err = directory.get(None, Uuid::new_v4()).await.unwrap_err();
        match err {
            AppError::Store(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
