//! Cloud transport error types.
//!
//! These errors stay internal to the bridge: the public [`CloudBridge`]
//! contract normalizes every failure to a boolean or an empty result, so
//! callers on the local-first write path never see an `Err` from the cloud.
//!
//! [`CloudBridge`]: crate::CloudBridge

use thiserror::Error;

/// A result type using `CloudError`.
pub type Result<T> = std::result::Result<T, CloudError>;

/// Errors that can occur talking to the remote backend.
#[derive(Debug, Error)]
pub enum CloudError {
    /// The HTTP transport failed (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("unexpected status: {0}")]
    Status(reqwest::StatusCode),

    /// The realtime websocket channel failed.
    #[error("websocket error: {0}")]
    WebSocket(String),

    /// A response body could not be decoded.
    #[error("malformed payload: {0}")]
    Payload(String),
}
