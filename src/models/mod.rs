use serde::{Deserialize, Serialize};

pub mod channel;
pub mod video;
pub mod viewer;

pub use channel::{Category, Channel, ChannelSummary};
pub use video::{rank_by_views, Video, VideoDetail, VideoListing};
pub use viewer::{AccountType, Viewer};

// ============================================================================
// Engagement payloads
// ============================================================================

/// Aggregate engagement state of a video as seen by one (optional) viewer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub views: i64,
    pub likes: i64,
    pub is_liked: bool,
    pub is_favorite: bool,
}

/// Like counter and the viewer's like state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub likes: i64,
    pub is_liked: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteState {
    pub is_favorite: bool,
}

/// Subscription state of a viewer on a channel, with the channel's counter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionState {
    pub is_subscribed: bool,
    pub subscribers: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewCount {
    pub views: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engagement_uses_camel_case_flags() {
        let engagement = Engagement {
            views: 100,
            likes: 5,
            is_liked: true,
            is_favorite: false,
        };
        let json = serde_json::to_value(engagement).unwrap();
        assert_eq!(json["isLiked"], true);
        assert_eq!(json["isFavorite"], false);
        assert_eq!(json["views"], 100);
    }

    #[test]
    fn test_subscription_state_serialization() {
        let state = SubscriptionState {
            is_subscribed: true,
            subscribers: 12,
        };
        let json = serde_json::to_string(&state).unwrap();
        assert_eq!(json, r#"{"isSubscribed":true,"subscribers":12}"#);
    }
}
