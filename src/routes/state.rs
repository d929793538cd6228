use std::sync::Arc;

use crate::{
    config::Config,
    db::Cache,
    middleware::IdentityResolver,
    services::{DirectoryService, EngagementService, RecommendationService, SubscriptionService},
    store::EngagementStore,
};

/// Shared application state
///
/// Every service talks to the same store; the cache, when present, only
/// fronts list responses.
#[derive(Clone)]
pub struct AppState {
    pub engagement: EngagementService,
    pub subscriptions: SubscriptionService,
    pub recommendations: RecommendationService,
    pub directory: DirectoryService,
    pub identity: IdentityResolver,
}

impl AppState {
    pub fn new(store: Arc<dyn EngagementStore>, cache: Option<Cache>, config: &Config) -> Self {
        let timeout = config.store_timeout();
        let ttl = config.cache_ttl();

        Self {
            engagement: EngagementService::new(store.clone(), timeout),
            subscriptions: SubscriptionService::new(store.clone(), timeout),
            recommendations: RecommendationService::new(
                store.clone(),
                cache.clone(),
                ttl,
                timeout,
            ),
            directory: DirectoryService::new(store.clone(), cache, ttl, timeout),
            identity: IdentityResolver::new(store, timeout),
        }
    }
}
