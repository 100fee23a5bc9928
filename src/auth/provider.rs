//! Authentication provider trait and implementations
//!
//! This module defines the authentication provider trait and provides
//! implementations for the supported Azure authentication methods.

use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use azure_identity::{ClientSecretCredential, DefaultAzureCredential, TokenCredentialOptions};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, VaultenvError};

const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Trait for Azure authentication providers
#[async_trait]
pub trait AzureAuthProvider: Send + Sync {
    /// Get an access token for the specified scopes
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;
}

/// Default Azure Credential Provider using DefaultAzureCredential
pub struct DefaultAzureCredentialProvider {
    credential: Arc<DefaultAzureCredential>,
}

impl DefaultAzureCredentialProvider {
    /// Create a new DefaultAzureCredentialProvider
    pub fn new() -> Result<Self> {
        let credential = Arc::new(
            DefaultAzureCredential::create(TokenCredentialOptions::default()).map_err(|e| {
                VaultenvError::authentication(format!(
                    "Failed to create DefaultAzureCredential: {}",
                    e
                ))
            })?,
        );

        Ok(Self { credential })
    }
}

#[async_trait]
impl AzureAuthProvider for DefaultAzureCredentialProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.credential
            .get_token(scopes)
            .await
            .map_err(|e| VaultenvError::authentication(format!("Failed to get token: {}", e)))
    }
}

/// Client Secret Authentication Provider
pub struct ClientSecretProvider {
    credential: Arc<ClientSecretCredential>,
}

impl ClientSecretProvider {
    /// Create a new ClientSecretProvider
    pub fn new(tenant_id: String, client_id: String, client_secret: String) -> Result<Self> {
        let authority_url = url::Url::parse(AUTHORITY_HOST)
            .map_err(|e| VaultenvError::config(format!("Invalid authority URL: {}", e)))?;

        let credential = Arc::new(ClientSecretCredential::new(
            azure_core::new_http_client(),
            authority_url,
            tenant_id,
            client_id,
            client_secret,
        ));

        Ok(Self { credential })
    }
}

#[async_trait]
impl AzureAuthProvider for ClientSecretProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.credential
            .get_token(scopes)
            .await
            .map_err(|e| VaultenvError::authentication(format!("Failed to get token: {}", e)))
    }
}

/// Authentication provider factory
pub struct AuthProviderFactory;

impl AuthProviderFactory {
    /// Create an authentication provider based on configuration
    pub fn create_provider(
        provider_type: &str,
        config: &HashMap<String, String>,
    ) -> Result<Arc<dyn AzureAuthProvider>> {
        debug!("Creating '{}' authentication provider", provider_type);
        match provider_type.to_lowercase().as_str() {
            "default" | "defaultazurecredential" => {
                Ok(Arc::new(DefaultAzureCredentialProvider::new()?))
            }
            "clientsecret" => {
                let require = |name: &str| {
                    config
                        .get(name)
                        .filter(|v| !v.is_empty())
                        .cloned()
                        .ok_or_else(|| {
                            VaultenvError::config(format!(
                                "{} is required for client secret authentication",
                                name
                            ))
                        })
                };

                Ok(Arc::new(ClientSecretProvider::new(
                    require("tenant_id")?,
                    require("client_id")?,
                    require("client_secret")?,
                )?))
            }
            _ => Err(VaultenvError::config(format!(
                "Unsupported authentication provider: {}",
                provider_type
            ))),
        }
    }
}
