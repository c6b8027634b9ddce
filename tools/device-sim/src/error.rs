//! Device client error types

use thiserror::Error;

/// Errors returned by [`DeviceClient`](crate::DeviceClient)
#[derive(Debug, Error)]
pub enum ClientError {
    /// Server unreachable or base URL unusable
    #[error("Connection error: {0}")]
    Connection(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("Server returned {status}: {body}")]
    Server { status: u16, body: String },

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl ClientError {
    /// HTTP status of a server-side rejection, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type for device client operations
pub type Result<T> = std::result::Result<T, ClientError>;
