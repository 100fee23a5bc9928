//! Retry logic with exponential backoff
//!
//! This module provides configurable retry functionality with
//! exponential backoff for handling transient failures.

use crate::error::{Result, VaultenvError};
use crate::utils::network::is_retryable_error;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryOptions {
    pub max_retries: usize,
    pub initial_interval: Duration,
    pub max_interval: Duration,
    pub multiplier: f64,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// runs out of attempts. Cancellation interrupts the backoff wait.
pub async fn retry_with_backoff<T, F, Fut>(
    mut operation: F,
    options: &RetryOptions,
    cancel: &CancellationToken,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut interval = options.initial_interval;
    let mut last_error = None;

    for attempt in 0..=options.max_retries {
        if attempt > 0 {
            tokio::select! {
                _ = cancel.cancelled() => return Err(VaultenvError::Cancelled),
                _ = sleep(interval) => {}
            }
            interval = std::cmp::min(
                Duration::from_secs_f64(interval.as_secs_f64() * options.multiplier),
                options.max_interval,
            );
        }

        match operation().await {
            Ok(result) => return Ok(result),
            Err(error) => {
                if !is_retryable_error(&error) {
                    return Err(error);
                }

                warn!("Attempt {} failed with retryable error: {}", attempt + 1, error);
                last_error = Some(error);
            }
        }
    }

    Err(last_error.unwrap_or(VaultenvError::Timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_options(max_retries: usize) -> RetryOptions {
        RetryOptions {
            max_retries,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(5),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result = retry_with_backoff(
            || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(VaultenvError::connection_timeout("slow"))
                } else {
                    Ok("done")
                }
            },
            &fast_options(3),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<()> = retry_with_backoff(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(VaultenvError::secret_not_found("db"))
            },
            &fast_options(3),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(VaultenvError::SecretNotFound { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let result: Result<()> = retry_with_backoff(
            || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(VaultenvError::connection_timeout("slow"))
            },
            &fast_options(2),
            &CancellationToken::new(),
        )
        .await;

        assert!(matches!(result, Err(VaultenvError::ConnectionTimeout(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_backoff() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result: Result<()> = retry_with_backoff(
            || async { Err(VaultenvError::connection_timeout("slow")) },
            &fast_options(5),
            &cancel,
        )
        .await;

        assert!(matches!(result, Err(VaultenvError::Cancelled)));
    }
}
