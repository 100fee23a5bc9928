//! Authentication module for Azure services
//!
//! Provides bearer tokens for Azure Key Vault using either
//! DefaultAzureCredential or a client secret.

pub mod provider;

pub use provider::*;
