//! Injection of loaded variables into an environment
//!
//! The [`Injector`] owns a parsed [`EnvSnapshot`] and an optional
//! [`SecretProvider`]. Secrets are resolved and every key is validated before
//! anything is written, so a failed injection leaves the target untouched.
//!
//! The process environment is global state. Running two injections into the
//! same process concurrently is the caller's responsibility to avoid.

use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::env::{EnvParser, EnvSnapshot};
use crate::error::{Result, VaultenvError};
use crate::loader::Loader;
use crate::provider::SecretProvider;

/// Something that environment variables can be written into.
pub trait EnvTarget {
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// The environment of the current process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvTarget for ProcessEnv {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_entry(key, value)?;
        std::env::set_var(key, value);
        Ok(())
    }
}

impl EnvTarget for HashMap<String, String> {
    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_entry(key, value)?;
        self.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reject entries the platform environment cannot hold.
pub fn validate_entry(key: &str, value: &str) -> Result<()> {
    if key.is_empty() {
        return Err(VaultenvError::invalid_key(key, "key is empty"));
    }
    if key.contains('=') {
        return Err(VaultenvError::invalid_key(key, "key contains '='"));
    }
    if key.contains('\0') {
        return Err(VaultenvError::invalid_key(key, "key contains a NUL byte"));
    }
    if value.contains('\0') {
        return Err(VaultenvError::invalid_key(key, "value contains a NUL byte"));
    }
    Ok(())
}

/// A modification applied to an [`Injector`] right after loading.
pub type InjectorOption = Box<dyn FnOnce(&mut Injector) -> Result<()> + Send>;

/// Install a secret provider, surfacing any error from building it.
pub fn with_secret_provider<P>(provider: Result<P>) -> InjectorOption
where
    P: SecretProvider + 'static,
{
    Box::new(move |injector: &mut Injector| {
        let provider = provider.map_err(|e| {
            VaultenvError::config(format!("Failed to initialize secret provider: {}", e))
        })?;
        injector.set_secret_provider(Box::new(provider));
        Ok(())
    })
}

/// Force a plain value for `key`, replacing whatever was loaded.
pub fn with_override<K: Into<String>, V: Into<String>>(key: K, value: V) -> InjectorOption {
    let key = key.into();
    let value = value.into();
    Box::new(move |injector: &mut Injector| {
        validate_entry(&key, &value)?;
        injector.snapshot_mut().set_plain(key, value);
        Ok(())
    })
}

/// A resolved entry ready to be written.
pub type ResolvedEntry = (String, Zeroizing<String>);

pub struct Injector {
    snapshot: EnvSnapshot,
    secret_provider: Option<Box<dyn SecretProvider>>,
}

impl Injector {
    /// Load from `loader` and apply `options` in order.
    pub fn new<L: Loader + ?Sized>(loader: &L, options: Vec<InjectorOption>) -> Result<Self> {
        let parser = EnvParser::new()?;
        let mut injector = Self::from_snapshot(loader.load(&parser)?);

        for option in options {
            option(&mut injector)?;
        }

        Ok(injector)
    }

    pub fn from_snapshot(snapshot: EnvSnapshot) -> Self {
        Self {
            snapshot,
            secret_provider: None,
        }
    }

    pub fn snapshot(&self) -> &EnvSnapshot {
        &self.snapshot
    }

    pub fn snapshot_mut(&mut self) -> &mut EnvSnapshot {
        &mut self.snapshot
    }

    pub fn set_secret_provider(&mut self, provider: Box<dyn SecretProvider>) {
        self.secret_provider = Some(provider);
    }

    pub fn has_secret_provider(&self) -> bool {
        self.secret_provider.is_some()
    }

    /// Resolve every entry without writing anything.
    ///
    /// Secrets are resolved one at a time; the first failure or a
    /// cancellation stops further resolutions.
    pub async fn resolve(&self, cancel: &CancellationToken) -> Result<Vec<ResolvedEntry>> {
        let secrets = self.snapshot.secrets();
        let provider = match (&self.secret_provider, secrets.is_empty()) {
            (_, true) => None,
            (Some(provider), false) => Some(provider),
            (None, false) => {
                return Err(VaultenvError::MissingResolver {
                    count: secrets.len(),
                })
            }
        };

        let mut entries = Vec::with_capacity(self.snapshot.len());

        if let Some(provider) = provider {
            for (key, reference) in secrets {
                if cancel.is_cancelled() {
                    return Err(VaultenvError::Cancelled);
                }

                debug!("Resolving secret for {}", key);
                let value = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(VaultenvError::Cancelled),
                    result = provider.decrypt(reference, cancel) => {
                        result.map_err(|e| VaultenvError::resolution(reference.as_str(), e))?
                    }
                };
                entries.push((key.clone(), Zeroizing::new(value)));
            }
        }

        for (key, value) in self.snapshot.plain() {
            entries.push((key.clone(), Zeroizing::new(value.clone())));
        }

        Ok(entries)
    }

    /// Resolve and write every entry into the current process environment.
    pub async fn inject(&self, cancel: &CancellationToken) -> Result<usize> {
        self.inject_into(&mut ProcessEnv, cancel).await
    }

    /// Resolve and write every entry into `target`.
    ///
    /// Returns the number of entries written.
    pub async fn inject_into<T: EnvTarget + ?Sized>(
        &self,
        target: &mut T,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let entries = self.resolve(cancel).await?;

        for (key, value) in &entries {
            validate_entry(key, value)?;
        }
        for (key, value) in &entries {
            target.set(key, value)?;
        }

        info!("Injected {} environment variables", entries.len());
        Ok(entries.len())
    }

    /// Release the secret provider. Consumes the injector.
    pub async fn close(self) -> Result<()> {
        match self.secret_provider {
            Some(provider) => provider.close().await,
            None => Ok(()),
        }
    }
}
