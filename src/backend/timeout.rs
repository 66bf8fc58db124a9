use std::{future::Future, time::Duration};

use super::error::{BackendError, BackendResult};

/// Bounds a backend round-trip; an elapsed deadline becomes [`BackendError::Timeout`].
pub async fn with_timeout<T, F>(timeout: Duration, request: F) -> BackendResult<T>
where
    F: Future<Output = BackendResult<T>>,
{
    match tokio::time::timeout(timeout, request).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout {
            after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}
