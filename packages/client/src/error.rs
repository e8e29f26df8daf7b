//! Error types for the porchlight client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The hub refused the handshake token
    #[error("The hub rejected the token (HTTP 401)")]
    Unauthorized,

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// An established connection dropped
    #[error("Connection lost")]
    ConnectionLost,

    /// REST transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// REST call answered with an error envelope
    #[error("Request rejected ({status} {code}): {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    /// Outbound frame could not be encoded
    #[error("Failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}
