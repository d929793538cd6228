use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::Viewer,
    routes::AppState,
    services::bounded,
    store::EngagementStore,
};

/// Resolves the viewer behind a request from its bearer session token
#[derive(Clone)]
pub struct IdentityResolver {
    store: Arc<dyn EngagementStore>,
    timeout: Duration,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn EngagementStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// The authenticated viewer, or `None` for anonymous or unknown sessions
    pub async fn current_viewer(&self, headers: &HeaderMap) -> AppResult<Option<Viewer>> {
        match bearer_token(headers) {
            Some(token) => bounded(self.timeout, self.store.viewer_for_session(token)).await,
            None => Ok(None),
        }
    }
}

/// Extracts the token of an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Optional identity; never rejects an anonymous request
#[derive(Debug, Clone)]
pub struct CurrentViewer(pub Option<Viewer>);

impl CurrentViewer {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|viewer| viewer.id)
    }
}

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for CurrentViewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let viewer = state.identity.current_viewer(&parts.headers).await?;
        Ok(CurrentViewer(viewer))
    }
}

/// Mandatory identity; rejects with `401` when no viewer is resolved
#[derive(Debug, Clone)]
pub struct RequireViewer(pub Viewer);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for RequireViewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let CurrentViewer(viewer) = CurrentViewer::from_request_parts(parts, state).await?;
        viewer.map(RequireViewer).ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_bearer_token_is_extracted() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("bearer   abc123 ")), Some("abc123"));
    }

    #[test]
    fn test_other_schemes_are_ignored() {
        assert_eq!(bearer_token(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&headers("Bearer")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
