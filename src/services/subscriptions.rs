use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::{bounded, retry_once_on_conflict};
use crate::{
    error::{AppError, AppResult},
    models::SubscriptionState,
    store::EngagementStore,
};

/// Viewer-to-channel subscriptions
///
/// Subscribing to one's own channel is allowed.
#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn EngagementStore>,
    timeout: Duration,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn EngagementStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Subscription flag for a viewer; anonymous viewers are never subscribed
    pub async fn get_subscription(
        &self,
        channel_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> AppResult<SubscriptionState> {
        let channel = bounded(self.timeout, self.store.channel(channel_id))
            .await?
            .ok_or_else(AppError::channel_not_found)?;

        let is_subscribed = match viewer_id {
            Some(viewer_id) => {
                bounded(self.timeout, self.store.is_subscribed(channel_id, viewer_id)).await?
            }
            None => false,
        };

        Ok(SubscriptionState {
            is_subscribed,
            subscribers: channel.subscribers,
        })
    }

    #[tracing::instrument(skip(self))]
    pub async fn toggle_subscription(
        &self,
        channel_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> AppResult<SubscriptionState> {
        let viewer_id = viewer_id.ok_or(AppError::Unauthorized)?;

        let state = retry_once_on_conflict(self.timeout, "toggle_subscription", || {
            self.store.toggle_subscription(channel_id, viewer_id)
        })
        .await?
        .ok_or_else(AppError::channel_not_found)?;

        tracing::info!(
            is_subscribed = state.is_subscribed,
            subscribers = state.subscribers,
            "Subscription toggled"
        );
        Ok(state)
    }
}
