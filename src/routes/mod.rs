use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware::from_fn,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    middleware::{make_span_with_request_id, request_id_middleware},
};

pub mod channels;
pub mod directory;
pub mod favorites;
pub mod state;
pub mod videos;

pub use state::AppState;

/// Creates the application router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Videos
        .route("/videos/featured", get(directory::featured))
        .route("/videos/:id", get(videos::detail))
        .route("/videos/:id/engagement", get(videos::engagement))
        .route("/videos/:id/like", get(videos::like_status).post(videos::toggle_like))
        .route("/videos/:id/view", post(videos::record_view))
        .route("/videos/:id/recommended", get(videos::recommended))
        // Favorites
        .route("/favorites", get(favorites::list))
        .route(
            "/favorites/:video_id",
            get(favorites::status).post(favorites::toggle),
        )
        // Channels
        .route("/channels/:id/subscription", get(channels::subscription))
        .route("/channels/:id/subscribe", post(channels::toggle_subscription))
        // Directory
        .route("/users", get(directory::users))
        .route("/categories", get(directory::categories))
        .layer(
            ServiceBuilder::new()
                .layer(from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// `?viewer=` and `?limit=` query parameters, kept as raw strings so that
/// malformed values produce the standard error payload
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub viewer: Option<String>,
    pub limit: Option<String>,
}

impl ListQuery {
    pub fn viewer(&self) -> AppResult<Option<Uuid>> {
        self.viewer
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                Uuid::parse_str(raw.trim())
                    .map_err(|_| AppError::InvalidInput(format!("invalid viewer id '{}'", raw)))
            })
            .transpose()
    }

    pub fn limit(&self) -> AppResult<Option<usize>> {
        self.limit
            .as_deref()
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| AppError::InvalidInput(format!("invalid limit '{}'", raw)))
            })
            .transpose()
    }
}

/// Parses a path id; a malformed id cannot name an existing entity
pub(crate) fn parse_id(raw: &str, not_found: fn() -> AppError) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| not_found())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_viewer_is_none() {
        let query = ListQuery {
            viewer: Some("  ".to_string()),
            limit: None,
        };
        assert_eq!(query.viewer().unwrap(), None);
    }

    #[test]
    fn test_malformed_limit_is_invalid_input() {
        let query = ListQuery {
            viewer: None,
            limit: Some("lots".to_string()),
        };
        assert!(matches!(query.limit(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_malformed_path_id_is_not_found() {
        let result = parse_id("not-a-uuid", AppError::video_not_found);
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
