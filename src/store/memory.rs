use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EngagementStore, Session};
use crate::{
    error::AppResult,
    models::{
        rank_by_views, AccountType, Category, Channel, ChannelSummary, FavoriteState, LikeState,
        SubscriptionState, Video, VideoListing, ViewCount, Viewer,
    },
};

/// In-process store backed by a single lock
///
/// Each toggle runs under one write guard, which makes the relation flip and
/// the counter adjustment a single atomic step.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    viewers: HashMap<Uuid, Viewer>,
    sessions: HashMap<String, Session>,
    categories: Vec<Category>,
    channels: HashMap<Uuid, Channel>,
    videos: HashMap<Uuid, Video>,
    /// (viewer, video)
    likes: HashSet<(Uuid, Uuid)>,
    /// (viewer, video) -> insertion sequence
    favorites: HashMap<(Uuid, Uuid), u64>,
    /// (viewer, channel)
    subscriptions: HashSet<(Uuid, Uuid)>,
    sequence: u64,
}

impl MemoryState {
    fn flip_like(&mut self, video_id: Uuid, viewer_id: Uuid) -> Option<LikeState> {
        let video = self.videos.get_mut(&video_id)?;
        let key = (viewer_id, video_id);
        let is_liked = if self.likes.remove(&key) {
            video.likes -= 1;
            false
        } else {
            self.likes.insert(key);
            video.likes += 1;
            true
        };

        Some(LikeState {
            likes: video.likes,
            is_liked,
        })
    }

    fn flip_favorite(&mut self, video_id: Uuid, viewer_id: Uuid) -> Option<FavoriteState> {
        if !self.videos.contains_key(&video_id) {
            return None;
        }

        let key = (viewer_id, video_id);
        let is_favorite = if self.favorites.remove(&key).is_some() {
            false
        } else {
            self.sequence += 1;
            self.favorites.insert(key, self.sequence);
            true
        };

        Some(FavoriteState { is_favorite })
    }

    fn flip_subscription(&mut self, channel_id: Uuid, viewer_id: Uuid) -> Option<SubscriptionState> {
        let channel = self.channels.get_mut(&channel_id)?;
        let key = (viewer_id, channel_id);
        let is_subscribed = if self.subscriptions.remove(&key) {
            channel.subscribers -= 1;
            false
        } else {
            self.subscriptions.insert(key);
            channel.subscribers += 1;
            true
        };

        Some(SubscriptionState {
            is_subscribed,
            subscribers: channel.subscribers,
        })
    }

    fn listing(&self, video: &Video) -> Option<VideoListing> {
        let channel = self.channels.get(&video.channel_id)?;
        Some(VideoListing {
            video: video.clone(),
            channel: ChannelSummary::from(channel),
        })
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_viewer(&self, viewer: Viewer) {
        let mut state = self.inner.write().await;
        state.viewers.insert(viewer.id, viewer);
    }

    pub async fn insert_session(&self, session: Session) {
        let mut state = self.inner.write().await;
        state.sessions.insert(session.token.clone(), session);
    }

    pub async fn insert_category(&self, category: Category) {
        let mut state = self.inner.write().await;
        state.categories.retain(|c| c.id != category.id);
        state.categories.push(category);
    }

    /// Inserts a channel. Its subscriber counter is derived from the
    /// subscriptions already recorded for it.
    pub async fn insert_channel(&self, mut channel: Channel) {
        let mut state = self.inner.write().await;
        channel.subscribers = state
            .subscriptions
            .iter()
            .filter(|(_, channel_id)| *channel_id == channel.id)
            .count() as i64;
        state.channels.insert(channel.id, channel);
    }

    /// Inserts a video. Its like counter is derived from the likes already
    /// recorded for it.
    pub async fn insert_video(&self, mut video: Video) {
        let mut state = self.inner.write().await;
        video.likes = state
            .likes
            .iter()
            .filter(|(_, video_id)| *video_id == video.id)
            .count() as i64;
        state.videos.insert(video.id, video);
    }

    /// Records that `viewer_id` likes `video_id` if not already the case
    pub async fn insert_like(&self, video_id: Uuid, viewer_id: Uuid) {
        let mut state = self.inner.write().await;
        if !state.likes.contains(&(viewer_id, video_id)) {
            state.flip_like(video_id, viewer_id);
        }
    }

    /// Records that `viewer_id` subscribes to `channel_id` if not already the case
    pub async fn insert_subscription(&self, channel_id: Uuid, viewer_id: Uuid) {
        let mut state = self.inner.write().await;
        if !state.subscriptions.contains(&(viewer_id, channel_id)) {
            state.flip_subscription(channel_id, viewer_id);
        }
    }

    /// Number of Like relations referencing a video
    pub async fn like_relations(&self, video_id: Uuid) -> usize {
        let state = self.inner.read().await;
        state
            .likes
            .iter()
            .filter(|(_, liked)| *liked == video_id)
            .count()
    }

    /// Builds a store from a JSON fixture, relations applied after entities
    pub async fn from_fixture(fixture: Fixture) -> Self {
        let store = Self::new();

        for viewer in fixture.viewers {
            store.insert_viewer(viewer).await;
        }
        for session in fixture.sessions {
            store.insert_session(session).await;
        }
        for category in fixture.categories {
            store.insert_category(category).await;
        }
        for channel in fixture.channels {
            store.insert_channel(channel).await;
        }
        for video in fixture.videos {
            store.insert_video(video).await;
        }
        for relation in fixture.likes {
            store.insert_like(relation.target_id, relation.viewer_id).await;
        }
        for relation in fixture.subscriptions {
            store.insert_subscription(relation.target_id, relation.viewer_id).await;
        }
        for relation in fixture.favorites {
            let mut state = store.inner.write().await;
            if !state.favorites.contains_key(&(relation.viewer_id, relation.target_id)) {
                state.flip_favorite(relation.target_id, relation.viewer_id);
            }
        }

        store
    }
}

/// A `(viewer, target)` pair in a seed fixture
#[derive(Debug, Clone, Deserialize)]
pub struct FixtureRelation {
    pub viewer_id: Uuid,
    pub target_id: Uuid,
}

/// Seed data for a [`MemoryStore`]
///
/// Counters in the fixture are ignored; they are derived from `likes` and
/// `subscriptions`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub viewers: Vec<Viewer>,
    pub sessions: Vec<Session>,
    pub categories: Vec<Category>,
    pub channels: Vec<Channel>,
    pub videos: Vec<Video>,
    pub likes: Vec<FixtureRelation>,
    pub favorites: Vec<FixtureRelation>,
    pub subscriptions: Vec<FixtureRelation>,
}

impl Fixture {
    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read fixture {}: {}", path.display(), e))?;
        serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Failed to parse fixture {}: {}", path.display(), e))
    }
}

#[async_trait::async_trait]
impl EngagementStore for MemoryStore {
    async fn video(&self, video_id: Uuid) -> AppResult<Option<Video>> {
        let state = self.inner.read().await;
        Ok(state.videos.get(&video_id).cloned())
    }

    async fn channel(&self, channel_id: Uuid) -> AppResult<Option<Channel>> {
        let state = self.inner.read().await;
        Ok(state.channels.get(&channel_id).cloned())
    }

    async fn is_liked(&self, video_id: Uuid, viewer_id: Uuid) -> AppResult<bool> {
        let state = self.inner.read().await;
        Ok(state.likes.contains(&(viewer_id, video_id)))
    }

    async fn is_favorite(&self, video_id: Uuid, viewer_id: Uuid) -> AppResult<bool> {
        let state = self.inner.read().await;
        Ok(state.favorites.contains_key(&(viewer_id, video_id)))
    }

    async fn is_subscribed(&self, channel_id: Uuid, viewer_id: Uuid) -> AppResult<bool> {
        let state = self.inner.read().await;
        Ok(state.subscriptions.contains(&(viewer_id, channel_id)))
    }

    async fn toggle_like(&self, video_id: Uuid, viewer_id: Uuid) -> AppResult<Option<LikeState>> {
        let mut state = self.inner.write().await;
        Ok(state.flip_like(video_id, viewer_id))
    }

    async fn toggle_favorite(
        &self,
        video_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<Option<FavoriteState>> {
        let mut state = self.inner.write().await;
        Ok(state.flip_favorite(video_id, viewer_id))
    }

    async fn toggle_subscription(
        &self,
        channel_id: Uuid,
        viewer_id: Uuid,
    ) -> AppResult<Option<SubscriptionState>> {
        let mut state = self.inner.write().await;
        Ok(state.flip_subscription(channel_id, viewer_id))
    }

    async fn increment_views(&self, video_id: Uuid) -> AppResult<Option<ViewCount>> {
        let mut state = self.inner.write().await;
        Ok(state.videos.get_mut(&video_id).map(|video| {
            video.views += 1;
            ViewCount { views: video.views }
        }))
    }

    async fn favorites(&self, viewer_id: Uuid) -> AppResult<Vec<VideoListing>> {
        let state = self.inner.read().await;
        let mut saved: Vec<(u64, Uuid)> = state
            .favorites
            .iter()
            .filter(|((viewer, _), _)| *viewer == viewer_id)
            .map(|((_, video_id), seq)| (*seq, *video_id))
            .collect();
        saved.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(saved
            .into_iter()
            .filter_map(|(_, video_id)| state.videos.get(&video_id))
            .filter_map(|video| state.listing(video))
            .collect())
    }

    async fn top_channel_videos(
        &self,
        channel_id: Uuid,
        exclude: Uuid,
        limit: usize,
    ) -> AppResult<Vec<Video>> {
        let state = self.inner.read().await;
        let mut videos: Vec<Video> = state
            .videos
            .values()
            .filter(|v| v.channel_id == channel_id && v.id != exclude)
            .cloned()
            .collect();
        rank_by_views(&mut videos);
        videos.truncate(limit);
        Ok(videos)
    }

    async fn top_videos(&self, exclude: Vec<Uuid>, limit: usize) -> AppResult<Vec<Video>> {
        let state = self.inner.read().await;
        let mut videos: Vec<Video> = state
            .videos
            .values()
            .filter(|v| !exclude.contains(&v.id))
            .cloned()
            .collect();
        rank_by_views(&mut videos);
        videos.truncate(limit);
        Ok(videos)
    }

    async fn featured_videos(&self, limit: usize) -> AppResult<Vec<VideoListing>> {
        let videos = self.top_videos(Vec::new(), limit).await?;
        let state = self.inner.read().await;
        Ok(videos
            .iter()
            .filter_map(|video| state.listing(video))
            .collect())
    }

    async fn viewers(&self, account_type: Option<AccountType>) -> AppResult<Vec<Viewer>> {
        let state = self.inner.read().await;
        let mut viewers: Vec<Viewer> = state
            .viewers
            .values()
            .filter(|v| account_type.map_or(true, |t| v.account_type == t))
            .cloned()
            .collect();
        viewers.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(viewers)
    }

    async fn categories(&self, limit: usize) -> AppResult<Vec<Category>> {
        let state = self.inner.read().await;
        let mut categories = state.categories.clone();
        categories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        categories.truncate(limit);
        Ok(categories)
    }

    async fn viewer_for_session(&self, token: &str) -> AppResult<Option<Viewer>> {
        let state = self.inner.read().await;
        Ok(state
            .sessions
            .get(token)
            .filter(|session| session.expires_at > Utc::now())
            .and_then(|session| state.viewers.get(&session.viewer_id))
            .cloned())
    }
}
