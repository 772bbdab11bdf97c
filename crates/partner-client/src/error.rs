//! Partner client errors

use thiserror::Error;

/// Errors that can occur when talking to a federation partner.
///
/// Non-2xx answers are not errors at this level; they come back as a
/// [`crate::PartnerResponse`] and are classified by the caller.
#[derive(Debug, Error)]
pub enum PartnerError {
    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Multipart body could not be built
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),

    /// Client could not be configured (bad URL, bad header value, ...)
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Registry lock was poisoned by a panicking thread
    #[error("Client registry unavailable: {0}")]
    Registry(String),
}

/// Errors raised while encoding or decoding multipart/form-data bodies
#[derive(Debug, Error)]
pub enum MultipartError {
    /// Structured field could not be JSON-encoded
    #[error("failed to encode field '{field}': {source}")]
    Encode {
        /// Field name
        field: String,
        /// Underlying error
        source: serde_json::Error,
    },

    /// Content-Type header is not multipart or lacks a boundary
    #[error("invalid Content-Type: {0}")]
    ContentType(String),

    /// Body does not follow the multipart framing
    #[error("malformed multipart body: {0}")]
    Malformed(String),

    /// Requested field is absent
    #[error("field '{0}' not found in multipart data")]
    FieldNotFound(String),
}
