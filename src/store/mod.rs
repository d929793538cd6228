//! Persistence boundary for videos, channels, viewers and their relations.
//!
//! Likes, favorites and subscriptions are keyed sets of `(viewer, target)`
//! pairs: a relation's existence is its boolean state. Every toggle flips
//! membership and adjusts the matching denormalized counter as one atomic
//! step, so `videos.likes` and `channels.subscribers` always equal the
//! cardinality of their relation sets.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        AccountType, Category, Channel, FavoriteState, LikeState, SubscriptionState, Video,
        VideoListing, ViewCount, Viewer,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::{Fixture, MemoryStore};
pub use postgres::PgStore;

/// A bearer session mapping a token to a viewer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub token: String,
    pub viewer_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Store operations the engagement services are built on
///
/// Mutating methods return `Ok(None)` when the target video or channel does
/// not exist, leaving the `NotFound` decision to the caller.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EngagementStore: Send + Sync {
    async fn video(&self, video_id: Uuid) -> AppResult<Option<Video>>;

    async fn channel(&self, channel_id: Uuid) -> AppResult<Option<Channel>>;

    async fn is_liked(&self, video_id: Uuid, viewer_id: Uuid) -> AppResult<bool>;

    async fn is_favorite(&self, video_id: Uuid, viewer_id: Uuid) -> AppResult<bool>;

    async fn is_subscribed(&self, channel_id: Uuid, viewer_id: Uuid) -> AppResult<bool>;

    /// Flips the Like relation and the video's like counter together
    async fn toggle_like(&self, video_id: Uuid, viewer_id: Uuid) -> AppResult<Option<LikeState>>;

    /// Flips the Favorite relation; favorites carry no counter
    async fn toggle_favorite(
        &self,
        video_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<Option<FavoriteState>>;

    /// Flips the Subscription relation and the channel's subscriber counter together
    async fn toggle_subscription(
        &self,
        channel_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<Option<SubscriptionState>>;

    async fn increment_views(&self, video_id: Uuid) -> AppResult<Option<ViewCount>>;

    /// Favorited videos of a viewer, most recently favorited first
    async fn favorites(&self, viewer_id: Uuid) -> AppResult<Vec<VideoListing>>;

    /// Most viewed videos of a channel other than `exclude`
    async fn top_channel_videos(
        &self,
        channel_id: Uuid,
        exclude: Uuid,
        limit: usize,
    ) -> AppResult<Vec<Video>>;

    /// Most viewed videos overall, skipping the ids in `exclude`
    async fn top_videos(&self, exclude: Vec<Uuid>, limit: usize) -> AppResult<Vec<Video>>;

    /// Most viewed videos overall with their channel summary
    async fn featured_videos(&self, limit: usize) -> AppResult<Vec<VideoListing>>;

    /// Viewers without credentials, newest first
    async fn viewers(&self, account_type: Option<AccountType>) -> AppResult<Vec<Viewer>>;

    async fn categories(&self, limit: usize) -> AppResult<Vec<Category>>;

    /// Resolves an unexpired session token to its viewer
    async fn viewer_for_session(&self, token: &str) -> AppResult<Option<Viewer>>;
}
