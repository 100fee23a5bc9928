use crate::error::{Result, VaultenvError};
use reqwest::Client;
use std::time::Duration;

/// Configuration for HTTP client with proper timeouts
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            user_agent: format!("vaultenv/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl NetworkConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| VaultenvError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Map a reqwest failure against a vault URL to a descriptive error
pub fn classify_network_error(error: &reqwest::Error, url: &str) -> VaultenvError {
    let host = extract_host(url);

    if error.is_timeout() {
        return VaultenvError::connection_timeout(format!(
            "Request to '{}' timed out",
            host
        ));
    }

    if error.is_connect() {
        return VaultenvError::network(format!(
            "Failed to connect to '{}': {}",
            host, error
        ));
    }

    if error.is_request() {
        return VaultenvError::invalid_url(format!("Invalid request to '{}': {}", host, error));
    }

    if let Some(status) = error.status() {
        if matches!(status.as_u16(), 502..=504) {
            return VaultenvError::network(format!(
                "'{}' is temporarily unavailable (HTTP {})",
                host, status
            ));
        }
    }

    VaultenvError::network(format!("Network error when accessing '{}': {}", host, error))
}

fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "unknown-host".to_string())
}

/// Check if an error is worth retrying
pub fn is_retryable_error(error: &VaultenvError) -> bool {
    match error {
        VaultenvError::ConnectionTimeout(_) | VaultenvError::Timeout => true,
        VaultenvError::NetworkError(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("timeout")
                || msg_lower.contains("temporarily")
                || msg_lower.contains("connect")
        }
        VaultenvError::AzureApiError(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("429")
                || msg_lower.contains("503")
                || msg_lower.contains("502")
                || msg_lower.contains("504")
                || msg_lower.contains("throttled")
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_host() {
        let url = "https://test-vault.vault.azure.net/secrets/test-secret";
        assert_eq!(extract_host(url), "test-vault.vault.azure.net");
        assert_eq!(extract_host("not a url"), "unknown-host");
    }

    #[test]
    fn test_is_retryable_error() {
        assert!(is_retryable_error(&VaultenvError::connection_timeout("timeout")));
        assert!(is_retryable_error(&VaultenvError::azure_api("HTTP 429 Too Many Requests")));
        assert!(!is_retryable_error(&VaultenvError::secret_not_found("db")));
        assert!(!is_retryable_error(&VaultenvError::Cancelled));
    }
}
