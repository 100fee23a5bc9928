//! vaultenv - environment files with Azure Key Vault secrets
//!
//! Parses `KEY=VALUE` sources, separates plain values from `!{reference}`
//! secret references, resolves the references through a pluggable
//! [`provider::SecretProvider`] and injects the result into the process
//! environment.

pub mod auth;
pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod injector;
pub mod loader;
pub mod provider;
pub mod utils;

// Re-export commonly used types
pub use env::{EnvParser, EnvSnapshot};
pub use error::{Result, VaultenvError};
pub use injector::{with_override, with_secret_provider, EnvTarget, Injector, InjectorOption, ProcessEnv};
pub use loader::{FileLoader, Loader, ProcessEnvLoader};
pub use provider::{SecretProvider, StaticProvider};
