//! Secret providers
//!
//! A [`SecretProvider`] turns a secret reference into its plain-text value.
//! The injector only sees this trait; the backend is chosen by whoever builds
//! the injector.

pub mod keyvault;
pub mod retrying;

use async_trait::async_trait;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, VaultenvError};

pub use keyvault::*;
pub use retrying::*;

/// Resolves secret references to plain text.
///
/// `close` must be called once when the provider is no longer needed. It may
/// be a no-op when there is no underlying connection.
#[async_trait]
pub trait SecretProvider: Send + Sync {
    /// Fetch the plain-text value for `reference`.
    async fn decrypt(&self, reference: &str, cancel: &CancellationToken) -> Result<String>;

    /// Release any underlying client.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl<P: SecretProvider + ?Sized> SecretProvider for Box<P> {
    async fn decrypt(&self, reference: &str, cancel: &CancellationToken) -> Result<String> {
        (**self).decrypt(reference, cancel).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

/// In-memory provider backed by a reference → value map.
#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    secrets: HashMap<String, String>,
}

impl StaticProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret<R: Into<String>, V: Into<String>>(mut self, reference: R, value: V) -> Self {
        self.secrets.insert(reference.into(), value.into());
        self
    }
}

impl<R: Into<String>, V: Into<String>> FromIterator<(R, V)> for StaticProvider {
    fn from_iter<I: IntoIterator<Item = (R, V)>>(iter: I) -> Self {
        Self {
            secrets: iter
                .into_iter()
                .map(|(r, v)| (r.into(), v.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl SecretProvider for StaticProvider {
    async fn decrypt(&self, reference: &str, cancel: &CancellationToken) -> Result<String> {
        if cancel.is_cancelled() {
            return Err(VaultenvError::Cancelled);
        }
        self.secrets
            .get(reference)
            .cloned()
            .ok_or_else(|| VaultenvError::secret_not_found(reference))
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticProvider::new().with_secret("ref", "value");
        let cancel = CancellationToken::new();

        assert_eq!(provider.decrypt("ref", &cancel).await.unwrap(), "value");
        assert!(matches!(
            provider.decrypt("other", &cancel).await,
            Err(VaultenvError::SecretNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_static_provider_cancelled() {
        let provider: StaticProvider = [("ref", "value")].into_iter().collect();
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(
            provider.decrypt("ref", &cancel).await,
            Err(VaultenvError::Cancelled)
        ));
    }
}
