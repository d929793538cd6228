use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};

use super::{parse_id, AppState, ListQuery};
use crate::{
    error::{AppError, AppResult},
    middleware::{CurrentViewer, RequestId, RequireViewer},
    models::SubscriptionState,
};

/// Subscription flag for `?viewer=` or the session viewer
pub async fn subscription(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ListQuery>,
    current: CurrentViewer,
) -> AppResult<Json<SubscriptionState>> {
    let channel_id = parse_id(&id, AppError::channel_not_found)?;
    let viewer_id = query.viewer()?.or(current.id());

    let subscription = state
        .subscriptions
        .get_subscription(channel_id, viewer_id)
        .await?;
    Ok(Json(subscription))
}

pub async fn toggle_subscription(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Path(id): Path<String>,
    RequireViewer(viewer): RequireViewer,
) -> AppResult<Json<SubscriptionState>> {
    let channel_id = parse_id(&id, AppError::channel_not_found)?;

    tracing::debug!(
        request_id = %request_id,
        channel_id = %channel_id,
        viewer_id = %viewer.id,
        "Toggling subscription"
    );

    let subscription = state
        .subscriptions
        .toggle_subscription(channel_id, Some(viewer.id))
        .await?;
    Ok(Json(subscription))
}
