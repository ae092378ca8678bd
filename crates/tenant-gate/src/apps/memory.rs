//! In-process app store for tests and local runs
//!
//! Mirrors the foreign keys of the relational schema (owner must exist, API
//! keys reference apps) but does not evaluate row-level security: every app
//! is visible to every caller.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use uuid::Uuid;

use super::error::{AppError, AppResult};
use super::model::{App, AppInput, PageRequest};
use super::store::AppStore;
use crate::auth::Claims;

/// API key columns the delete cascade touches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub app_id: Option<Uuid>,
    pub revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct State {
    users: HashSet<Uuid>,
    /// Insertion order
    apps: Vec<App>,
    api_keys: HashMap<Uuid, ApiKeyRecord>,
}

#[derive(Debug, Default)]
pub struct MemoryAppStore {
    state: Mutex<State>,
    register_owners: bool,
}

impl MemoryAppStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that registers unknown owners on first insert instead of
    /// rejecting them
    #[must_use]
    pub fn with_owner_registration() -> Self {
        Self {
            state: Mutex::default(),
            register_owners: true,
        }
    }

    /// Register a user that may own apps
    pub fn add_user(&self, id: Uuid) {
        self.state.lock().users.insert(id);
    }

    /// Create an active API key, optionally scoped to an app.
    ///
    /// Returns `None` if `app_id` names an app that does not exist.
    pub fn insert_api_key(&self, app_id: Option<Uuid>) -> Option<Uuid> {
        let mut state = self.state.lock();
        if let Some(app_id) = app_id
            && !state.apps.iter().any(|a| a.id == app_id)
        {
            return None;
        }
        let id = Uuid::new_v4();
        state.api_keys.insert(
            id,
            ApiKeyRecord {
                id,
                app_id,
                revoked_at: None,
            },
        );
        Some(id)
    }

    /// Revoke a key without detaching it
    pub fn revoke_api_key(&self, id: Uuid, at: DateTime<Utc>) {
        if let Some(key) = self.state.lock().api_keys.get_mut(&id) {
            key.revoked_at.get_or_insert(at);
        }
    }

    pub fn api_key(&self, id: Uuid) -> Option<ApiKeyRecord> {
        self.state.lock().api_keys.get(&id).copied()
    }
}

#[async_trait]
impl AppStore for MemoryAppStore {
    async fn insert(
        &self,
        _claims: Option<&Claims>,
        owner: Uuid,
        input: &AppInput,
    ) -> AppResult<App> {
        let mut state = self.state.lock();
        if !state.users.contains(&owner) {
            if !self.register_owners {
                return Err(AppError::OwnerNotFound);
            }
            state.users.insert(owner);
        }

        let now = Utc::now();
        let app = App {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            description: input.description.clone(),
            owner_user_id: owner,
            rate_limit_rps: input.rate_limit_rps,
            rate_limit_window_seconds: input.rate_limit_window_seconds,
            created_at: now,
            updated_at: now,
        };
        state.apps.push(app.clone());
        Ok(app)
    }

    async fn fetch(&self, _claims: Option<&Claims>, id: Uuid) -> AppResult<Option<App>> {
        Ok(self.state.lock().apps.iter().find(|a| a.id == id).cloned())
    }

    async fn list(
        &self,
        _claims: Option<&Claims>,
        page: PageRequest,
    ) -> AppResult<(Vec<App>, u64)> {
        let state = self.state.lock();
        let items = state
            .apps
            .iter()
            .rev()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        Ok((items, state.apps.len() as u64))
    }

    async fn update(
        &self,
        _claims: Option<&Claims>,
        id: Uuid,
        input: &AppInput,
    ) -> AppResult<Option<App>> {
        let mut state = self.state.lock();
        let Some(app) = state.apps.iter_mut().find(|a| a.id == id) else {
            return Ok(None);
        };
        app.name.clone_from(&input.name);
        app.description.clone_from(&input.description);
        app.rate_limit_rps = input.rate_limit_rps;
        app.rate_limit_window_seconds = input.rate_limit_window_seconds;
        app.updated_at = Utc::now();
        Ok(Some(app.clone()))
    }

    async fn delete_cascade(&self, _claims: Option<&Claims>, id: Uuid) -> AppResult<bool> {
        // one lock for the whole cascade, so it is atomic to other callers
        let mut state = self.state.lock();
        let Some(index) = state.apps.iter().position(|a| a.id == id) else {
            return Ok(false);
        };

        let now = Utc::now();
        for key in state.api_keys.values_mut() {
            if key.app_id == Some(id) {
                key.revoked_at.get_or_insert(now);
                key.app_id = None;
            }
        }
        state.apps.remove(index);
        Ok(true)
    }
}
