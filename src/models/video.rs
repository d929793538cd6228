use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Channel, ChannelSummary};

/// A talent video published on a channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Video {
    pub id: Uuid,
    pub title: String,
    /// Source URL of the media
    pub video_url: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Public view counter, only moved by an explicit view record
    #[serde(default)]
    pub views: i64,
    /// Denormalized count of Like relations
    #[serde(default)]
    pub likes: i64,
    pub channel_id: Uuid,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Video {
    /// Creates a new video with zeroed counters
    pub fn new(title: impl Into<String>, video_url: impl Into<String>, channel_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            video_url: video_url.into(),
            thumbnail: None,
            views: 0,
            likes: 0,
            channel_id,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    pub fn with_views(mut self, views: i64) -> Self {
        self.views = views;
        self
    }

    /// Popularity order: most viewed first, ties broken by ascending id
    pub fn popularity_cmp(&self, other: &Self) -> Ordering {
        other.views.cmp(&self.views).then_with(|| self.id.cmp(&other.id))
    }
}

/// Sorts videos into popularity order in place
pub fn rank_by_views(videos: &mut [Video]) {
    videos.sort_by(Video::popularity_cmp);
}

/// A video together with a minimal projection of its channel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoListing {
    #[serde(flatten)]
    pub video: Video,
    pub channel: ChannelSummary,
}

/// Full detail view: the video, its channel and related videos
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VideoDetail {
    #[serde(flatten)]
    pub video: Video,
    pub channel: Channel,
    pub recommended: Vec<Video>,
}
