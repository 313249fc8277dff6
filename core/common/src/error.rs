//! Common error types for DocDrive.

use thiserror::Error;

/// Top-level error type for DocDrive operations.
#[derive(Debug, Error)]
pub enum Error {
    /// No usable credential, or the consent flow failed.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The provider rejected the credential (expired or revoked grant).
    #[error("Authorization expired: {0}")]
    AuthorizationExpired(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other failure reported by the storage provider.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether this error should trigger a one-shot re-authentication.
    pub fn is_authorization_expired(&self) -> bool {
        matches!(self, Error::AuthorizationExpired(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_expired_grant_is_retryable() {
        assert!(Error::AuthorizationExpired("invalid_grant".into()).is_authorization_expired());
        assert!(!Error::Authentication("missing".into()).is_authorization_expired());
        assert!(!Error::NotFound("abc".into()).is_authorization_expired());
    }

    #[test]
    fn test_json_error_maps_to_serialization() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Serialization(_)));
    }
}
