//! Error types for the vLLM client
//!
//! A single error enum covers construction, transport, status, timeout and
//! decoding failures for both the blocking and the streaming call paths.

use thiserror::Error;

/// Main error type for vLLM client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Malformed base URL supplied at construction
    #[error("Configuration error: {0}")]
    Config(String),

    /// Server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    /// Effective request timeout elapsed
    ///
    /// `duration_ms` is 0 when the timeout came from an injected reqwest client.
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },

    /// Malformed JSON or unexpected response shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Connection closed while a frame was still incomplete
    #[error("Unexpected end of stream: {buffered} bytes without a frame delimiter")]
    TruncatedStream { buffered: usize },

    /// A single frame grew past the decoder limit
    #[error("Frame too large: {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    /// Rejected by the opt-in sampling parameter check
    #[error("Invalid sampling parameters: {0}")]
    InvalidParams(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Translate a transport error, folding reqwest timeouts into `Timeout`
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Option<std::time::Duration>) -> Self {
        if err.is_timeout() {
            let duration_ms = timeout.map(|t| t.as_millis() as u64).unwrap_or(0);
            return ClientError::Timeout { duration_ms };
        }
        ClientError::Http(err)
    }

    /// True for errors raised because the effective timeout elapsed
    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::Timeout { .. })
    }

    /// HTTP status code, when the server rejected the request
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
