use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{parse_id, AppState, ListQuery};
use crate::{
    error::{AppError, AppResult},
    middleware::{CurrentViewer, RequestId, RequireViewer},
    models::{Engagement, LikeState, Video, VideoDetail, ViewCount},
    services::recommendations::clamp_limit,
};

/// Video detail with its channel and related videos
///
/// Recommendations are best effort: a failure there yields an empty list
/// rather than failing the detail read. Does not count a view.
pub async fn detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<VideoDetail>> {
    let video_id = parse_id(&id, AppError::video_not_found)?;
    let limit = clamp_limit(query.limit()?);

    let (video, channel) = state.engagement.video_with_channel(video_id).await?;
    let recommended = state.recommendations.recommend_or_empty(&video, limit).await;

    Ok(Json(VideoDetail {
        video,
        channel,
        recommended,
    }))
}

/// Counters plus like/favorite flags for `?viewer=` or the session viewer
pub async fn engagement(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
    current: CurrentViewer,
) -> AppResult<Json<Engagement>> {
    let video_id = parse_id(&id, AppError::video_not_found)?;
    let viewer_id = query.viewer()?.or(current.id());

    let engagement = state.engagement.get_engagement(video_id, viewer_id).await?;
    Ok(Json(engagement))
}

pub async fn like_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    current: CurrentViewer,
) -> AppResult<Json<LikeState>> {
    let video_id = parse_id(&id, AppError::video_not_found)?;
    let like = state.engagement.like_state(video_id, current.id()).await?;
    Ok(Json(like))
}

pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    RequireViewer(viewer): RequireViewer,
) -> AppResult<Json<LikeState>> {
    let video_id = parse_id(&id, AppError::video_not_found)?;

    tracing::debug!(
        request_id = %request_id,
        video_id = %video_id,
        viewer_id = %viewer.id,
        "Toggling like"
    );

    let like = state
        .engagement
        .toggle_like(video_id, Some(viewer.id))
        .await?;
    Ok(Json(like))
}

pub async fn record_view(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ViewCount>> {
    let video_id = parse_id(&id, AppError::video_not_found)?;
    let views = state.engagement.record_view(video_id).await?;
    Ok(Json(views))
}

/// Related videos; a missing video is 404, a failing selector is `[]`
pub async fn recommended(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Video>>> {
    let video_id = parse_id(&id, AppError::video_not_found)?;
    let limit = clamp_limit(query.limit()?);

    let video = state.engagement.video(video_id).await?;
    let recommended = state.recommendations.recommend_or_empty(&video, limit).await;
    Ok(Json(recommended))
}
