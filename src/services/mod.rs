use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

pub mod directory;
pub mod engagement;
pub mod recommendations;
pub mod subscriptions;

pub use directory::DirectoryService;
pub use engagement::EngagementService;
pub use recommendations::RecommendationService;
pub use subscriptions::SubscriptionService;

/// Runs a single persistence round trip with an upper time bound
///
/// A call that outlives `timeout` surfaces as `Unavailable` instead of
/// holding the request open.
pub(crate) async fn bounded<T, F>(timeout: Duration, call: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Unavailable(format!(
            "store call exceeded {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Runs a toggle, retrying exactly once on `Conflict`
///
/// A conflict that persists on the second attempt is reported as an
/// internal failure.
pub(crate) async fn retry_once_on_conflict<T, F, Fut>(
    timeout: Duration,
    operation: &'static str,
    mut call: F,
) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    match bounded(timeout, call()).await {
        Err(AppError::Conflict(reason)) => {
            tracing::warn!(operation, reason = %reason, "Toggle conflicted, retrying once");
            bounded(timeout, call()).await.map_err(|e| match e {
                AppError::Conflict(reason) => {
                    AppError::Internal(format!("{} kept conflicting: {}", operation, reason))
                }
                other => other,
            })
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TIMEOUT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_bounded_times_out_as_unavailable() {
        let result: AppResult<()> = bounded(TIMEOUT, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        assert!(matches!(result, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_single_conflict() {
        let attempts = AtomicUsize::new(0);
        let result = retry_once_on_conflict(TIMEOUT, "toggle_like", || {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(AppError::Conflict("serialization failure".into()))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(tokio_test::assert_ok!(result), 1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_persistent_conflict_becomes_internal() {
        let attempts = AtomicUsize::new(0);
        let result: AppResult<()> = retry_once_on_conflict(TIMEOUT, "toggle_like", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::Conflict("deadlock detected".into())) }
        })
        .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let attempts = AtomicUsize::new(0);
        let result: AppResult<()> = retry_once_on_conflict(TIMEOUT, "toggle_like", || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::video_not_found()) }
        })
        .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
