use crate::response::{BackendError, ErrorResponse};
use thiserror::Error;

/// Main error type for Stratum API operations
#[derive(Debug, Error)]
pub enum StratumError {
    /// Missing or invalid configuration, detected before any network call
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The caller broke the verb/payload contract
    #[error("{0}")]
    Usage(String),

    /// An authenticated call was attempted before `Client::open` succeeded
    #[error("client not opened with open()")]
    NotOpened,

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Network failure, or a non-2xx response that did not carry JSON.
    ///
    /// For responses the message is the status line rebuilt from the code
    /// and its canonical reason phrase ("503 Service Unavailable"). A custom
    /// reason phrase sent by the server is not preserved, and a code without
    /// a canonical reason yields the bare number ("599").
    #[error("{message}")]
    Transport {
        message: String,
        #[source]
        source: Option<reqwest::Error>,
    },

    /// A 2xx response with a content type other than JSON
    #[error("unexpected content type: {content_type}")]
    Protocol { content_type: String },

    /// Structured error returned by the API
    #[error("{0}")]
    Api(ErrorResponse),
}

impl StratumError {
    /// Create a transport error that carries only a message, such as a status line
    pub fn transport(message: impl Into<String>) -> Self {
        StratumError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Check if this error is a permission denied error (403)
    pub fn is_permission_denied(&self) -> bool {
        self.status_code() == Some(403)
    }

    /// Check if this error is a not found error (404)
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Get the HTTP status code if this is an API error
    pub fn status_code(&self) -> Option<u16> {
        match self {
            StratumError::Api(response) => Some(response.status_code),
            _ => None,
        }
    }

    /// Backend (database) detail attached to an API error, if any
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            StratumError::Api(response) => response.backend.as_ref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StratumError {
    fn from(err: reqwest::Error) -> Self {
        StratumError::Transport {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Result type for Stratum operations
pub type Result<T> = std::result::Result<T, StratumError>;
