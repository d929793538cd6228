use std::sync::Arc;
use std::time::Duration;

use super::bounded;
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::AppResult,
    models::{AccountType, Category, VideoListing, Viewer},
    store::EngagementStore,
};

pub const DEFAULT_FEATURED_LIMIT: usize = 6;
pub const MAX_FEATURED_LIMIT: usize = 12;
pub const DEFAULT_CATEGORY_LIMIT: usize = 3;
pub const MAX_CATEGORY_LIMIT: usize = 50;

/// Browsing lists: accounts, featured videos and categories
#[derive(Clone)]
pub struct DirectoryService {
    store: Arc<dyn EngagementStore>,
    cache: Option<Cache>,
    cache_ttl: Duration,
    timeout: Duration,
}

impl DirectoryService {
    pub fn new(
        store: Arc<dyn EngagementStore>,
        cache: Option<Cache>,
        cache_ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            cache_ttl,
            timeout,
        }
    }

    /// Accounts without credentials, newest first, optionally filtered by type
    ///
    /// The type is a plain filter: a value no account can carry matches
    /// nothing.
    pub async fn list_viewers(&self, account_type: Option<&str>) -> AppResult<Vec<Viewer>> {
        let account_type = match account_type.map(str::parse::<AccountType>) {
            None => None,
            Some(Ok(account_type)) => Some(account_type),
            Some(Err(reason)) => {
                tracing::debug!(reason = %reason, "Account type filter matches no viewer");
                return Ok(Vec::new());
            }
        };

        bounded(self.timeout, self.store.viewers(account_type)).await
    }

    /// Globally most viewed videos with their channel summary
    pub async fn featured_videos(&self, limit: Option<usize>) -> AppResult<Vec<VideoListing>> {
        let limit = limit
            .unwrap_or(DEFAULT_FEATURED_LIMIT)
            .clamp(1, MAX_FEATURED_LIMIT);

        cached!(
            self.cache.as_ref(),
            CacheKey::Featured(limit),
            self.cache_ttl.as_secs(),
            bounded(self.timeout, self.store.featured_videos(limit))
        )
    }

    pub async fn categories(&self, limit: Option<usize>) -> AppResult<Vec<Category>> {
        let limit = limit
            .unwrap_or(DEFAULT_CATEGORY_LIMIT)
            .clamp(1, MAX_CATEGORY_LIMIT);

        cached!(
            self.cache.as_ref(),
            CacheKey::Categories(limit),
            self.cache_ttl.as_secs(),
            bounded(self.timeout, self.store.categories(limit))
        )
    }
}
