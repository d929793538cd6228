use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{parse_id, AppState};
use crate::{
    error::{AppError, AppResult},
    middleware::{RequestId, RequireViewer},
    models::{FavoriteState, VideoListing},
};

/// The session viewer's saved videos, most recently favorited first
pub async fn list(
    State(state): State<Arc<AppState>>,
    RequireViewer(viewer): RequireViewer,
) -> AppResult<Json<Vec<VideoListing>>> {
    let favorites = state.engagement.list_favorites(Some(viewer.id)).await?;
    Ok(Json(favorites))
}

pub async fn status(
    State(state): State<Arc<AppState>>,
    Path(video_id): Path<String>,
    RequireViewer(viewer): RequireViewer,
) -> AppResult<Json<FavoriteState>> {
    let video_id = parse_id(&video_id, AppError::video_not_found)?;
    let favorite = state
        .engagement
        .favorite_state(video_id, Some(viewer.id))
        .await?;
    Ok(Json(favorite))
}

pub async fn toggle(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(video_id): Path<String>,
    RequireViewer(viewer): RequireViewer,
) -> AppResult<Json<FavoriteState>> {
    let video_id = parse_id(&video_id, AppError::video_not_found)?;

    tracing::debug!(
        request_id = %request_id,
        video_id = %video_id,
        viewer_id = %viewer.id,
        "Toggling favorite"
    );

    let favorite = state
        .engagement
        .toggle_favorite(video_id, Some(viewer.id))
        .await?;
    Ok(Json(favorite))
}
