//! Errors from the transport layer.

use std::time::Duration;
use thiserror::Error;

/// Errors from the wire protocol layer.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Message too large: {size} bytes (max {max})")]
    MessageTooLarge { size: u32, max: u32 },
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Remote error {code}: {message}")]
    Remote { code: String, message: String },
    #[error("Unexpected frame: {0}")]
    UnexpectedFrame(String),
    #[error("HTTP error: {0}")]
    Http(String),
    /// The peer answered with a body that is not a tunnel envelope.
    #[error("Malformed reply: {0}")]
    MalformedReply(String),
}
