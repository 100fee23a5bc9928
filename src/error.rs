use thiserror::Error;

/// Main error type for vaultenv operations
#[derive(Debug, Error)]
pub enum VaultenvError {
    #[error("Malformed line {line:?}: {reason}")]
    MalformedLine { line: String, reason: String },

    #[error("Source unavailable: {source_name}: {details}")]
    SourceUnavailable {
        source_name: String,
        details: String,
    },

    #[error("{count} secret(s) were loaded but no secret provider is configured")]
    MissingResolver { count: usize },

    #[error("Failed to resolve secret '{reference}': {source}")]
    Resolution {
        reference: String,
        source: Box<VaultenvError>,
    },

    #[error("Invalid environment key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Azure API error: {0}")]
    AzureApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Secret not found: {name}")]
    SecretNotFound { name: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation timeout")]
    Timeout,

    #[error("Operation cancelled")]
    Cancelled,
}

impl VaultenvError {
    pub fn malformed_line<L: Into<String>, R: Into<String>>(line: L, reason: R) -> Self {
        Self::MalformedLine {
            line: line.into(),
            reason: reason.into(),
        }
    }

    pub fn source_unavailable<N: Into<String>, D: ToString>(source_name: N, details: D) -> Self {
        Self::SourceUnavailable {
            source_name: source_name.into(),
            details: details.to_string(),
        }
    }

    /// Wraps a provider failure with the reference that caused it.
    ///
    /// Cancellation is passed through untouched so callers can match on it directly.
    pub fn resolution<S: Into<String>>(reference: S, source: VaultenvError) -> Self {
        match source {
            Self::Cancelled => Self::Cancelled,
            other => Self::Resolution {
                reference: reference.into(),
                source: Box::new(other),
            },
        }
    }

    pub fn invalid_key<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationError(msg.into())
    }

    pub fn azure_api<S: Into<String>>(msg: S) -> Self {
        Self::AzureApiError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn secret_not_found<S: Into<String>>(name: S) -> Self {
        Self::SecretNotFound { name: name.into() }
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn connection_timeout<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionTimeout(msg.into())
    }

    pub fn invalid_url<S: Into<String>>(msg: S) -> Self {
        Self::InvalidUrl(msg.into())
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// The reference of a failed resolution, if this is one.
    pub fn failed_reference(&self) -> Option<&str> {
        match self {
            Self::Resolution { reference, .. } => Some(reference),
            _ => None,
        }
    }
}

/// Result type alias for vaultenv operations
pub type Result<T> = std::result::Result<T, VaultenvError>;

/// Convert Azure Core errors to VaultenvError
impl From<azure_core::Error> for VaultenvError {
    fn from(error: azure_core::Error) -> Self {
        Self::AzureApiError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_line_message_contains_line() {
        let err = VaultenvError::malformed_line("NO_SEPARATOR", "missing '='");
        assert!(err.to_string().contains("NO_SEPARATOR"));
    }

    #[test]
    fn test_resolution_keeps_reference() {
        let err = VaultenvError::resolution("vault/db-pass", VaultenvError::secret_not_found("db-pass"));
        assert_eq!(err.failed_reference(), Some("vault/db-pass"));
        assert!(err.to_string().contains("vault/db-pass"));
        assert!(err.to_string().contains("Secret not found"));
    }

    #[test]
    fn test_resolution_passes_cancellation_through() {
        let err = VaultenvError::resolution("ref", VaultenvError::Cancelled);
        assert!(matches!(err, VaultenvError::Cancelled));
    }
}
