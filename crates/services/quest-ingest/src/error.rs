//! Error types for the ingestion server

use std::path::PathBuf;

/// Errors raised while handling a single ingestion or confirmation request
///
/// Every variant is recoverable: the HTTP layer converts it into a
/// structured error response and keeps serving.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Status update target is absent (never created, or already evicted)
    #[error("Message not found: {0}")]
    NotFound(String),

    /// Durable write failed
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Unexpected fault while processing
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    /// Shorthand for a validation failure
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Short machine-readable kind used in error response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Validation(_) => "validation",
            IngestError::NotFound(_) => "not_found",
            IngestError::Persistence(_) => "persistence",
            IngestError::Internal(_) => "internal",
        }
    }
}

/// Failures of the persistence sink
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("IO error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
}

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(IngestError::validation("bad").kind(), "validation");
        assert_eq!(IngestError::NotFound("msg_000001".into()).kind(), "not_found");
        assert_eq!(IngestError::Internal("boom".into()).kind(), "internal");

        let err: IngestError = PersistenceError::Encode("short buffer".into()).into();
        assert_eq!(err.kind(), "persistence");
        assert_eq!(err.to_string(), "Encode error: short buffer");
    }

    #[test]
    fn test_not_found_message() {
        let err = IngestError::NotFound("msg_000042".to_string());
        assert_eq!(err.to_string(), "Message not found: msg_000042");
    }
}
