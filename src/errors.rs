//! Error types for AskBuddy
//!
//! Pipeline-critical failures carry a distinguishable kind so the caller
//! (an HTTP layer, the CLI) can map them to a status without string matching.

use thiserror::Error;

/// Main error type for the ask pipeline
#[derive(Error, Debug)]
pub enum AskError {
    /// Client-fixable input problems (empty question)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Question embedding failed or timed out
    #[error("Embedding failed: {0}")]
    EmbeddingError(String),

    /// Remote match store configured but broken.
    /// `status` is 0 when no HTTP status was received.
    #[error("Remote match store failed: {status} {body}")]
    UpstreamError { status: u16, body: String },

    /// Language model call failed or timed out
    #[error("Generation failed: {0}")]
    GenerationError(String),

    /// State machine transition errors
    #[error("Invalid state transition from {from} via {event}")]
    InvalidTransition { from: String, event: String },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Copyable discriminant of [`AskError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    Embedding,
    Upstream,
    Generation,
    Internal,
}

impl AskError {
    /// Build an upstream error from a transport failure (no status received)
    pub fn upstream_transport(detail: impl Into<String>) -> Self {
        AskError::UpstreamError {
            status: 0,
            body: detail.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AskError::InvalidInput(_) => ErrorKind::InvalidInput,
            AskError::EmbeddingError(_) => ErrorKind::Embedding,
            AskError::UpstreamError { .. } => ErrorKind::Upstream,
            AskError::GenerationError(_) => ErrorKind::Generation,
            _ => ErrorKind::Internal,
        }
    }

    /// Status class for the inbound `Ask` RPC
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidInput => 400,
            ErrorKind::Upstream => 502,
            ErrorKind::Embedding | ErrorKind::Generation | ErrorKind::Internal => 500,
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, AskError>;
