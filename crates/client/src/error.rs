//! Error types for the catalog client.

use tabula_emitter::SinkError;

/// Errors that can occur when talking to the catalog.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP transport error (connection, DNS, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Authentication failed (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Permission denied (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Request refused by the catalog (4xx)
    #[error("Rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
        /// Request ID for tracking
        request_id: Option<String>,
    },

    /// Server error (5xx)
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Error message from server
        message: String,
        /// Request ID for tracking
        request_id: Option<String>,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns the request ID if available.
    pub fn request_id(&self) -> Option<&str> {
        match self {
            ClientError::Rejected { request_id, .. } => request_id.as_deref(),
            ClientError::ServerError { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }
}

impl From<ClientError> for SinkError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Http(e) => SinkError::Unavailable(e.to_string()),
            ClientError::ServerError { status, message, .. } => {
                SinkError::Unavailable(format!("server error ({}): {}", status, message))
            }
            ClientError::Unauthorized(msg) | ClientError::Forbidden(msg) => {
                SinkError::Unauthorized(msg)
            }
            ClientError::Rejected {
                status, message, ..
            } => SinkError::Rejected { status, message },
            ClientError::Serialization(e) => SinkError::Serialization(e.to_string()),
            ClientError::Config(msg) => SinkError::Unavailable(msg),
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
