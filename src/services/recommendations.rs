use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::bounded;
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::Video,
    store::EngagementStore,
};

pub const DEFAULT_LIMIT: usize = 3;
pub const MIN_LIMIT: usize = 3;
pub const MAX_LIMIT: usize = 6;

/// Clamps a requested list size into the supported window
pub fn clamp_limit(requested: Option<usize>) -> usize {
    requested
        .unwrap_or(DEFAULT_LIMIT)
        .clamp(MIN_LIMIT, MAX_LIMIT)
}

/// Selects related videos for a source video
///
/// Policy: videos from the source's channel first, most viewed first; when
/// the channel has fewer than `limit` other videos, the remainder is filled
/// with the globally most viewed videos not already picked. The source video
/// is never included, and ties are broken by ascending id, so a fixed data
/// snapshot always yields the same list.
#[derive(Clone)]
pub struct RecommendationService {
    store: Arc<dyn EngagementStore>,
    cache: Option<Cache>,
    cache_ttl: Duration,
    timeout: Duration,
}

impl RecommendationService {
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

    /// Recommendations for a video id; fails `NotFound` for unknown videos
    pub async fn recommend(&self, video_id: Uuid, limit: usize) -> AppResult<Vec<Video>> {
        let source = bounded(self.timeout, self.store.video(video_id))
            .await?
            .ok_or_else(AppError::video_not_found)?;
        self.recommend_for_video(&source, limit).await
    }

    /// Recommendations for an already loaded video
    pub async fn recommend_for_video(&self, source: &Video, limit: usize) -> AppResult<Vec<Video>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let key = CacheKey::Recommendations {
            video_id: source.id,
            limit,
        };
        cached!(
            self.cache.as_ref(),
            key,
            self.cache_ttl.as_secs(),
            self.select(source, limit)
        )
    }

    /// Same as [`recommend_for_video`](Self::recommend_for_video), degrading
    /// any failure to an empty list
    pub async fn recommend_or_empty(&self, source: &Video, limit: usize) -> Vec<Video> {
        match self.recommend_for_video(source, limit).await {
            Ok(videos) => videos,
            Err(e) => {
                tracing::warn!(video_id = %source.id, error = %e, "Recommendations unavailable, returning none");
                Vec::new()
            }
        }
    }

    async fn select(&self, source: &Video, limit: usize) -> AppResult<Vec<Video>> {
        let mut picks = bounded(
            self.timeout,
            self.store
                .top_channel_videos(source.channel_id, source.id, limit),
        )
        .await?;

        if picks.len() < limit {
            let mut exclude: Vec<Uuid> = picks.iter().map(|v| v.id).collect();
            exclude.push(source.id);

            let fill = bounded(
                self.timeout,
                self.store.top_videos(exclude, limit - picks.len()),
            )
            .await?;

            tracing::debug!(
                video_id = %source.id,
                same_channel = picks.len(),
                global_fill = fill.len(),
                "Widened recommendations to global popularity"
            );
            picks.extend(fill);
        }

        picks.truncate(limit);
        Ok(picks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountType, Channel, Viewer};
    use crate::store::{MemoryStore, MockEngagementStore};

    const TIMEOUT: Duration = Duration::from_millis(200);

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn video(n: u128, channel: u128, views: i64) -> Video {
        Video::new(format!("V{}", n), "https://youtu.be/x", id(channel))
            .with_id(id(n))
            .with_views(views)
    }

    async fn catalog() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_viewer(Viewer::new("Owner", "o@example.com", AccountType::Talent).with_id(id(1)))
            .await;
        store.insert_channel(Channel::new("C1", id(1)).with_id(id(10))).await;
        store.insert_channel(Channel::new("C2", id(1)).with_id(id(20))).await;
        store.insert_video(video(101, 10, 100)).await;
        store.insert_video(video(102, 10, 50)).await;
        store.insert_video(video(103, 10, 10)).await;
        store.insert_video(video(201, 20, 500)).await;
        store.insert_video(video(202, 20, 50)).await;
        store
    }

    fn service(store: Arc<dyn EngagementStore>) -> RecommendationService {
        RecommendationService::new(store, None, Duration::from_secs(60), TIMEOUT)
    }

    fn ids(videos: &[Video]) -> Vec<Uuid> {
        videos.iter().map(|v| v.id).collect()
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None), 3);
        assert_eq!(clamp_limit(Some(1)), 3);
        assert_eq!(clamp_limit(Some(5)), 5);
        assert_eq!(clamp_limit(Some(50)), 6);
    }

    #[tokio::test]
    async fn test_same_channel_ranked_by_views() {
        let recommender = service(Arc::new(catalog().await));

        let picks = recommender.recommend(id(101), 2).await.unwrap();
        assert_eq!(ids(&picks), vec![id(102), id(103)]);
    }

    #[tokio::test]
    async fn test_widens_to_global_popularity_without_source() {
        let recommender = service(Arc::new(catalog().await));

        let picks = recommender.recommend(id(101), 4).await.unwrap();
        // C1 offers two; the rest is the global top of what is left
        assert_eq!(ids(&picks), vec![id(102), id(103), id(201), id(202)]);
        assert!(!ids(&picks).contains(&id(101)));
    }

    #[tokio::test]
    async fn test_never_returns_more_than_available() {
        let recommender = service(Arc::new(catalog().await));

        let picks = recommender.recommend(id(101), 6).await.unwrap();
        assert_eq!(picks.len(), 4);
    }

    #[tokio::test]
    async fn test_tie_break_is_by_id() {
        let store = catalog().await;
        store.insert_video(video(104, 10, 50)).await;
        let recommender = service(Arc::new(store));

        let picks = recommender.recommend(id(101), 3).await.unwrap();
        assert_eq!(ids(&picks), vec![id(102), id(104), id(103)]);
    }

    #[tokio::test]
    async fn test_unknown_video_is_not_found() {
        let recommender = service(Arc::new(catalog().await));
        let result = recommender.recommend(id(999), 3).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_full_channel_does_not_query_global() {
        let mut store = MockEngagementStore::new();
        store
            .expect_top_channel_videos()
            .returning(|_, _, _| Ok(vec![video(102, 10, 50), video(103, 10, 10)]));
        store.expect_top_videos().never();

        let picks = service(Arc::new(store))
            .recommend_for_video(&video(101, 10, 100), 2)
            .await
            .unwrap();
        assert_eq!(picks.len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_empty() {
        let mut store = MockEngagementStore::new();
        store
            .expect_top_channel_videos()
            .returning(|_, _, _| Err(AppError::Unavailable("pool timed out".into())));

        let picks = service(Arc::new(store))
            .recommend_or_empty(&video(101, 10, 100), 3)
            .await;
        assert!(picks.is_empty());
    }
}
