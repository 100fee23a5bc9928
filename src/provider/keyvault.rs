//! Azure Key Vault secret provider
//!
//! Resolves references through the Key Vault REST API. A reference may be a
//! full secret URL, `vault/name[/version]`, or a bare `name` resolved against
//! the configured default vault.

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::auth::provider::AzureAuthProvider;
use crate::error::{Result, VaultenvError};
use crate::provider::SecretProvider;
use crate::utils::network::{classify_network_error, create_http_client, NetworkConfig};

const KEYVAULT_SCOPE: &str = "https://vault.azure.net/.default";
const API_VERSION: &str = "7.4";
const SECRET_NAME_PATTERN: &str = r"^[0-9A-Za-z-]{1,127}$";

/// Where a secret lives in Key Vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretLocator {
    pub vault_url: String,
    pub name: String,
    pub version: Option<String>,
}

impl SecretLocator {
    /// Split a reference into vault URL, secret name and optional version.
    pub fn parse(reference: &str, default_vault: Option<&str>) -> Result<Self> {
        if reference.starts_with("https://") {
            return Self::parse_url(reference);
        }

        let parts: Vec<&str> = reference.split('/').collect();
        let (vault, name, version) = match parts.as_slice() {
            [name] => {
                let vault = default_vault.filter(|v| !v.is_empty()).ok_or_else(|| {
                    VaultenvError::config(format!(
                        "Secret reference '{}' has no vault and no default vault is configured",
                        reference
                    ))
                })?;
                (vault, *name, None)
            }
            [vault, name] => (*vault, *name, None),
            [vault, name, version] => (*vault, *name, Some(*version)),
            _ => {
                return Err(VaultenvError::invalid_argument(format!(
                    "Unrecognized secret reference '{}'",
                    reference
                )))
            }
        };

        if vault.is_empty() || name.is_empty() || version.is_some_and(str::is_empty) {
            return Err(VaultenvError::invalid_argument(format!(
                "Unrecognized secret reference '{}'",
                reference
            )));
        }

        Ok(Self {
            vault_url: vault_url(vault),
            name: name.to_string(),
            version: version.map(str::to_string),
        })
    }

    fn parse_url(reference: &str) -> Result<Self> {
        let url = url::Url::parse(reference)
            .map_err(|e| VaultenvError::invalid_url(format!("{}: {}", reference, e)))?;
        let host = url
            .host_str()
            .ok_or_else(|| VaultenvError::invalid_url(format!("{}: missing host", reference)))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            ["secrets", name] => Ok(Self {
                vault_url: format!("https://{}", host),
                name: name.to_string(),
                version: None,
            }),
            ["secrets", name, version] => Ok(Self {
                vault_url: format!("https://{}", host),
                name: name.to_string(),
                version: Some(version.to_string()),
            }),
            _ => Err(VaultenvError::invalid_url(format!(
                "{}: expected https://<vault>/secrets/<name>[/<version>]",
                reference
            ))),
        }
    }

    pub fn secret_url(&self) -> String {
        match &self.version {
            Some(version) => format!(
                "{}/secrets/{}/{}?api-version={}",
                self.vault_url, self.name, version, API_VERSION
            ),
            None => format!(
                "{}/secrets/{}?api-version={}",
                self.vault_url, self.name, API_VERSION
            ),
        }
    }
}

/// Get vault URL from vault name
fn vault_url(vault_name: &str) -> String {
    format!("https://{}.vault.azure.net", vault_name)
}

/// Secret provider backed by Azure Key Vault.
pub struct KeyVaultProvider {
    auth_provider: Arc<dyn AzureAuthProvider>,
    client: Client,
    default_vault: Option<String>,
    name_re: Regex,
}

impl KeyVaultProvider {
    pub fn new(
        auth_provider: Arc<dyn AzureAuthProvider>,
        default_vault: Option<String>,
        network_config: &NetworkConfig,
    ) -> Result<Self> {
        Ok(Self {
            auth_provider,
            client: create_http_client(network_config)?,
            default_vault,
            name_re: Regex::new(SECRET_NAME_PATTERN)?,
        })
    }

    fn locate(&self, reference: &str) -> Result<SecretLocator> {
        let locator = SecretLocator::parse(reference, self.default_vault.as_deref())?;
        if !self.name_re.is_match(&locator.name) {
            return Err(VaultenvError::invalid_argument(format!(
                "Invalid Key Vault secret name '{}'",
                locator.name
            )));
        }
        Ok(locator)
    }

    async fn fetch(&self, locator: &SecretLocator) -> Result<String> {
        let token = self.auth_provider.get_token(&[KEYVAULT_SCOPE]).await?;
        let secret_url = locator.secret_url();

        let response = self
            .client
            .get(&secret_url)
            .bearer_auth(token.token.secret())
            .send()
            .await
            .map_err(|e| classify_network_error(&e, &secret_url))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(VaultenvError::secret_not_found(locator.name.clone()));
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(VaultenvError::azure_api(format!(
                "Failed to get secret: HTTP {} - {}",
                status, error_text
            )));
        }

        let json: serde_json::Value = response.json().await.map_err(|e| {
            VaultenvError::serialization(format!("Failed to parse secret response: {}", e))
        })?;

        json.get("value")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| VaultenvError::serialization("Secret response has no value"))
    }
}

#[async_trait]
impl SecretProvider for KeyVaultProvider {
    async fn decrypt(&self, reference: &str, cancel: &CancellationToken) -> Result<String> {
        let locator = self.locate(reference)?;
        debug!("Fetching secret '{}' from {}", locator.name, locator.vault_url);

        tokio::select! {
            _ = cancel.cancelled() => Err(VaultenvError::Cancelled),
            result = self.fetch(&locator) => result,
        }
    }

    async fn close(&self) -> Result<()> {
        // reqwest closes pooled connections when the client drops.
        debug!("Closing Key Vault provider");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vault_and_name() {
        let locator = SecretLocator::parse("prod-vault/db-password", None).unwrap();
        assert_eq!(locator.vault_url, "https://prod-vault.vault.azure.net");
        assert_eq!(locator.name, "db-password");
        assert_eq!(locator.version, None);
        assert_eq!(
            locator.secret_url(),
            "https://prod-vault.vault.azure.net/secrets/db-password?api-version=7.4"
        );
    }

    #[test]
    fn test_parse_with_version() {
        let locator = SecretLocator::parse("prod-vault/db-password/abc123", None).unwrap();
        assert_eq!(locator.version.as_deref(), Some("abc123"));
        assert_eq!(
            locator.secret_url(),
            "https://prod-vault.vault.azure.net/secrets/db-password/abc123?api-version=7.4"
        );
    }

    #[test]
    fn test_parse_bare_name_uses_default_vault() {
        let locator = SecretLocator::parse("api-key", Some("dev-vault")).unwrap();
        assert_eq!(locator.vault_url, "https://dev-vault.vault.azure.net");

        let err = SecretLocator::parse("api-key", None).unwrap_err();
        assert!(matches!(err, VaultenvError::ConfigError(_)));
    }

    #[test]
    fn test_parse_full_url() {
        let locator =
            SecretLocator::parse("https://my-vault.vault.azure.net/secrets/token/v2", None).unwrap();
        assert_eq!(locator.vault_url, "https://my-vault.vault.azure.net");
        assert_eq!(locator.name, "token");
        assert_eq!(locator.version.as_deref(), Some("v2"));
    }

    #[test]
    fn test_parse_rejects_bad_references() {
        assert!(SecretLocator::parse("a/b/c/d", None).is_err());
        assert!(SecretLocator::parse("/name", None).is_err());
        assert!(SecretLocator::parse("https://my-vault.vault.azure.net/keys/k", None).is_err());
    }
}
