use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use super::{bounded, retry_once_on_conflict};
use crate::{
    error::{AppError, AppResult},
    models::{Channel, Engagement, FavoriteState, LikeState, Video, VideoListing, ViewCount},
    store::EngagementStore,
};

/// Reads and mutates the per-video engagement state
///
/// Viewer identities arrive already resolved; `None` means the request is
/// anonymous. Mutations require a viewer and fail with `Unauthorized`
/// before touching the store otherwise.
#[derive(Clone)]
pub struct EngagementService {
    store: Arc<dyn EngagementStore>,
    timeout: Duration,
}

impl EngagementService {
    pub fn new(store: Arc<dyn EngagementStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn video(&self, video_id: Uuid) -> AppResult<Video> {
        bounded(self.timeout, self.store.video(video_id))
            .await?
            .ok_or_else(AppError::video_not_found)
    }

    /// The video together with its owning channel
    pub async fn video_with_channel(&self, video_id: Uuid) -> AppResult<(Video, Channel)> {
        let video = self.video(video_id).await?;
        let channel = bounded(self.timeout, self.store.channel(video.channel_id))
            .await?
            .ok_or_else(AppError::channel_not_found)?;
        Ok((video, channel))
    }

    /// Counters plus the viewer's like/favorite flags. Never mutates.
    #[tracing::instrument(skip(self))]
    pub async fn get_engagement(
        &self,
        video_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> AppResult<Engagement> {
        let video = self.video(video_id).await?;

        let (is_liked, is_favorite) = match viewer_id {
            Some(viewer_id) => tokio::try_join!(
                bounded(self.timeout, self.store.is_liked(video_id, viewer_id)),
                bounded(self.timeout, self.store.is_favorite(video_id, viewer_id)),
            )?,
            None => (false, false),
        };

        Ok(Engagement {
            views: video.views,
            likes: video.likes,
            is_liked,
            is_favorite,
        })
    }

    /// Like counter and, when a viewer is known, whether they like the video
    pub async fn like_state(&self, video_id: Uuid, viewer_id: Option<Uuid>) -> AppResult<LikeState> {
        let video = self.video(video_id).await?;
        let is_liked = match viewer_id {
            Some(viewer_id) => bounded(self.timeout, self.store.is_liked(video_id, viewer_id)).await?,
            None => false,
        };

        Ok(LikeState {
            likes: video.likes,
            is_liked,
        })
    }

    pub async fn favorite_state(
        &self,
        video_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> AppResult<FavoriteState> {
        let viewer_id = viewer_id.ok_or(AppError::Unauthorized)?;
        self.video(video_id).await?;
        let is_favorite =
            bounded(self.timeout, self.store.is_favorite(video_id, viewer_id)).await?;
        Ok(FavoriteState { is_favorite })
    }

    #[tracing::instrument(skip(self))]
    pub async fn toggle_like(&self, video_id: Uuid, viewer_id: Option<Uuid>) -> AppResult<LikeState> {
        let viewer_id = viewer_id.ok_or(AppError::Unauthorized)?;

        let state = retry_once_on_conflict(self.timeout, "toggle_like", || {
            self.store.toggle_like(video_id, viewer_id)
        })
        .await?
        .ok_or_else(AppError::video_not_found)?;

        tracing::info!(likes = state.likes, is_liked = state.is_liked, "Like toggled");
        Ok(state)
    }

    #[tracing::instrument(skip(self))]
    pub async fn toggle_favorite(
        &self,
        video_id: Uuid,
        viewer_id: Option<Uuid>,
    ) -> AppResult<FavoriteState> {
        let viewer_id = viewer_id.ok_or(AppError::Unauthorized)?;

        let state = retry_once_on_conflict(self.timeout, "toggle_favorite", || {
            self.store.toggle_favorite(video_id, viewer_id)
        })
        .await?
        .ok_or_else(AppError::video_not_found)?;

        tracing::info!(is_favorite = state.is_favorite, "Favorite toggled");
        Ok(state)
    }

    /// Saved videos of a viewer, most recently favorited first
    pub async fn list_favorites(&self, viewer_id: Option<Uuid>) -> AppResult<Vec<VideoListing>> {
        let viewer_id = viewer_id.ok_or(AppError::Unauthorized)?;
        bounded(self.timeout, self.store.favorites(viewer_id)).await
    }

    /// Counts one view, without any per-viewer dedup
    pub async fn record_view(&self, video_id: Uuid) -> AppResult<ViewCount> {
        bounded(self.timeout, self.store.increment_views(video_id))
            .await?
            .ok_or_else(AppError::video_not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockEngagementStore;
    use mockall::{predicate::eq, Sequence};

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn service(store: MockEngagementStore) -> EngagementService {
        EngagementService::new(Arc::new(store), Duration::from_millis(200))
    }

    fn video() -> Video {
        let mut video = Video::new("V1", "https://youtu.be/1", id(10)).with_id(id(100));
        video.views = 100;
        video.likes = 5;
        video
    }

    #[tokio::test]
    async fn test_anonymous_engagement_skips_relation_lookups() {
        let mut store = MockEngagementStore::new();
        store
            .expect_video()
            .with(eq(id(100)))
            .returning(|_| Ok(Some(video())));
        store.expect_is_liked().never();
        store.expect_is_favorite().never();

        let engagement = service(store).get_engagement(id(100), None).await.unwrap();
        assert_eq!(
            engagement,
            Engagement {
                views: 100,
                likes: 5,
                is_liked: false,
                is_favorite: false
            }
        );
    }

    #[tokio::test]
    async fn test_engagement_for_missing_video_is_not_found() {
        let mut store = MockEngagementStore::new();
        store.expect_video().returning(|_| Ok(None));

        let result = service(store).get_engagement(id(404), Some(id(1))).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_anonymous_toggles_never_reach_the_store() {
        let mut store = MockEngagementStore::new();
        store.expect_toggle_like().never();
        store.expect_toggle_favorite().never();
        let service = service(store);

        assert!(matches!(
            service.toggle_like(id(100), None).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            service.toggle_favorite(id(100), None).await,
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            service.list_favorites(None).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_toggle_like_retries_a_conflict_once() {
        let mut store = MockEngagementStore::new();
        let mut seq = Sequence::new();
        store
            .expect_toggle_like()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(AppError::Conflict("could not serialize access".into())));
        store
            .expect_toggle_like()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| {
                Ok(Some(LikeState {
                    likes: 6,
                    is_liked: true,
                }))
            });

        let state = service(store)
            .toggle_like(id(100), Some(id(1)))
            .await
            .unwrap();
        assert_eq!(state, LikeState { likes: 6, is_liked: true });
    }

    #[tokio::test]
    async fn test_toggle_like_on_missing_video_is_not_found() {
        let mut store = MockEngagementStore::new();
        store.expect_toggle_like().times(1).returning(|_, _| Ok(None));

        let result = service(store).toggle_like(id(404), Some(id(1))).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unavailable_store_is_not_retried() {
        let mut store = MockEngagementStore::new();
        store
            .expect_toggle_favorite()
            .times(1)
            .returning(|_, _| Err(AppError::Unavailable("pool timed out".into())));

        let result = service(store).toggle_favorite(id(100), Some(id(1))).await;
        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_record_view_on_missing_video_is_not_found() {
        let mut store = MockEngagementStore::new();
        store.expect_increment_views().returning(|_| Ok(None));

        let result = service(store).record_view(id(404)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_favorites_is_not_an_error() {
        let mut store = MockEngagementStore::new();
        store
            .expect_favorites()
            .with(eq(id(1)))
            .returning(|_| Ok(Vec::new()));

        let favorites = service(store).list_favorites(Some(id(1))).await.unwrap();
        assert!(favorites.is_empty());
    }
}
