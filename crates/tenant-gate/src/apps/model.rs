//! App (tenant) records and pagination types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner_user_id: Uuid,
    pub rate_limit_rps: i32,
    pub rate_limit_window_seconds: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Writable fields of an app, used for both create and update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInput {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub rate_limit_rps: i32,
    #[serde(default)]
    pub rate_limit_window_seconds: i32,
}

impl AppInput {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub const fn with_rate_limit(mut self, rps: i32, window_seconds: i32) -> Self {
        self.rate_limit_rps = rps;
        self.rate_limit_window_seconds = window_seconds;
        self
    }
}

/// Normalised page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Page is at least 1; size defaults to 20 and is clamped to `[1, 100]`
    #[must_use]
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size
                .unwrap_or(DEFAULT_PAGE_SIZE)
                .clamp(1, MAX_PAGE_SIZE),
        }
    }

    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.page_size)
    }
}

/// One page of results
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Never null, empty when there are no rows
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> Page<T> {
    #[must_use]
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            page: request.page,
            page_size: request.page_size,
            total_pages: total.div_ceil(u64::from(request.page_size)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let req = PageRequest::new(None, None);
        assert_eq!(req, PageRequest::default());
        assert_eq!(req.page_size, 20);
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn test_page_request_clamping() {
        assert_eq!(PageRequest::new(Some(0), Some(0)), PageRequest { page: 1, page_size: 1 });
        assert_eq!(PageRequest::new(Some(3), Some(500)).page_size, 100);

        let req = PageRequest::new(Some(3), Some(25));
        assert_eq!(req.offset(), 50);
        assert_eq!(req.limit(), 25);
    }

    #[test]
    fn test_page_totals() {
        let page: Page<u8> = Page::new(vec![], 0, PageRequest::default());
        assert_eq!(page.total_pages, 0);
        assert!(page.items.is_empty());

        let page = Page::new(vec![1, 2], 41, PageRequest::new(Some(3), Some(20)));
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.page, 3);
    }

    #[test]
    fn test_empty_page_serializes_items_as_array() {
        let page: Page<App> = Page::new(Vec::new(), 0, PageRequest::default());
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["items"], serde_json::json!([]));
    }

    #[test]
    fn test_input_defaults_on_deserialize() {
        let input: AppInput = serde_json::from_str(r#"{"name": "billing"}"#).unwrap();
        assert_eq!(input, AppInput::new("billing"));
    }
}
