// src/utils/timeout.rs

use std::future::Future;
use std::time::Duration;

use crate::error::AppError;

/// Runs `operation` with a deadline, mapping an expiry into `Cancelled`
/// rather than a bespoke timeout variant — a timed-out provider or store
/// call is, from the caller's point of view, indistinguishable from one
/// that was cancelled.
pub async fn with_timeout<F, T>(duration: Duration, operation: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    match tokio::time::timeout(duration, operation).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Cancelled),
    }
}
