use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{AppState, ListQuery};
use crate::{
    error::AppResult,
    models::{Category, VideoListing, Viewer},
};

#[derive(Debug, Deserialize)]
pub struct UsersQuery {
    #[serde(rename = "type")]
    pub account_type: Option<String>,
}

/// Accounts, newest first; credentials are never part of the payload
pub async fn users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UsersQuery>,
) -> AppResult<Json<Vec<Viewer>>> {
    let account_type = query.account_type.as_deref().filter(|t| !t.is_empty());
    let viewers = state.directory.list_viewers(account_type).await?;
    Ok(Json(viewers))
}

/// Most viewed videos across all channels
pub async fn featured(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<VideoListing>>> {
    let videos = state.directory.featured_videos(query.limit()?).await?;
    Ok(Json(videos))
}

pub async fn categories(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<Category>>> {
    let categories = state.directory.categories(query.limit()?).await?;
    Ok(Json(categories))
}
