//! Optimistic-concurrency retry loop.

use std::future::Future;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Attempts made before a version conflict is surfaced to the caller
pub const MAX_RETRIES: u32 = 3;

/// Re-run a read-compute-commit cycle while it loses version races.
///
/// Each attempt must re-read its inputs; only `VersionConflict` is retried.
pub async fn retry_on_conflict<T, F, Fut>(operation: &'static str, mut attempt_fn: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut attempt = 0;
    loop {
        match attempt_fn().await {
            Err(AppError::VersionConflict) if attempt < MAX_RETRIES - 1 => {
                let delay = Duration::from_millis(50 * (attempt as u64 + 1));
                tracing::warn!(
                    operation,
                    "Concurrency conflict, retrying (attempt {}/{})",
                    attempt + 1,
                    MAX_RETRIES
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
