use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::provider::SecretProvider;
use crate::utils::retry::{retry_with_backoff, RetryOptions};

/// Wraps a provider and retries transient failures with exponential backoff.
pub struct RetryingProvider<P> {
    inner: P,
    options: RetryOptions,
}

impl<P: SecretProvider> RetryingProvider<P> {
    pub fn new(inner: P, options: RetryOptions) -> Self {
        Self { inner, options }
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

#[async_trait]
impl<P: SecretProvider> SecretProvider for RetryingProvider<P> {
    async fn decrypt(&self, reference: &str, cancel: &CancellationToken) -> Result<String> {
        let inner = &self.inner;
        retry_with_backoff(move || inner.decrypt(reference, cancel), &self.options, cancel).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VaultenvError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FlakyProvider {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SecretProvider for FlakyProvider {
        async fn decrypt(&self, reference: &str, _cancel: &CancellationToken) -> Result<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(VaultenvError::network("service temporarily unavailable"));
            }
            Ok(format!("value-of-{}", reference))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn options() -> RetryOptions {
        RetryOptions {
            max_retries: 2,
            initial_interval: Duration::from_millis(1),
            max_interval: Duration::from_millis(2),
            multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let provider = RetryingProvider::new(
            FlakyProvider {
                failures: 2,
                calls: AtomicUsize::new(0),
            },
            options(),
        );

        let value = provider.decrypt("db", &CancellationToken::new()).await.unwrap();
        assert_eq!(value, "value-of-db");
        assert_eq!(provider.into_inner().calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_surface_last_error() {
        let provider = RetryingProvider::new(
            FlakyProvider {
                failures: 10,
                calls: AtomicUsize::new(0),
            },
            options(),
        );

        let err = provider.decrypt("db", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, VaultenvError::NetworkError(_)));
    }
}
