//! Error types for the client.

use thiserror::Error;

/// Errors that can occur when calling the control plane.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Failed to establish connection.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The base URL cannot carry a request path.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server rejected the request.
    #[error("rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}
