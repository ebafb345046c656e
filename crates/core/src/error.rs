//! Error types for gdpilot-core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gdpilot-core
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for gdpilot-core
#[derive(Error, Debug)]
pub enum Error {
    /// Session state errors (not authorized, refresh failed, ...)
    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    /// No export mapping or extension for a MIME type
    #[error("Unsupported mime type ({0})")]
    UnsupportedType(String),

    /// Upload, download or export failed mid-flight
    #[error("Transfer failed: {0}")]
    Transfer(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Invalid configuration format
    #[error("Invalid configuration format: {0}")]
    InvalidConfig(String),

    /// Google Drive API errors
    #[error("Google Drive API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Rejected credentials
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    /// Deserialization error
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// The provider kept returning continuation tokens
    #[error("Listing stopped after {0} pages")]
    PageLimitExceeded(u32),

    /// Timeout
    #[error("Operation timed out")]
    Timeout,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

/// Errors raised by the session state machine and the OAuth flow
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    #[error("The drive client has not been authorized")]
    NotAuthorized,

    #[error("The drive client has already been authorized")]
    AlreadyAuthorized,

    #[error("Authorization is already in progress")]
    InProgress,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Authorization did not complete within {0} seconds")]
    Timeout(u64),

    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("Authorization denied: {0}")]
    Denied(String),

    #[error("No refresh token was issued; revoke the app's access and authorize again")]
    MissingRefreshToken,
}

impl Error {
    /// Shorthand for an empty/blank required argument
    pub(crate) fn empty_argument(name: &str) -> Self {
        Error::InvalidInput(format!("{} cannot be empty", name))
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout
        } else if err.is_connect() {
            Error::Network(err.to_string())
        } else if err.is_request() {
            Error::HttpClient(err.to_string())
        } else {
            Error::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let error = Error::Api {
            status: 404,
            message: "File not found".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Google Drive API error (status 404): File not found"
        );
    }

    #[test]
    fn test_authorization_error_conversion() {
        let error: Error = AuthorizationError::NotAuthorized.into();

        assert!(matches!(
            error,
            Error::Authorization(AuthorizationError::NotAuthorized)
        ));
        assert_eq!(
            error.to_string(),
            "Authorization error: The drive client has not been authorized"
        );
    }

    #[test]
    fn test_empty_argument() {
        let error = Error::empty_argument("folder name");
        assert_eq!(error.to_string(), "Invalid input: folder name cannot be empty");
    }
}
