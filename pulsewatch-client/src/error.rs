//! Error types for the client.

use thiserror::Error;

/// Errors that can occur while connecting, refreshing, or configuring.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connecting to the stream endpoint failed.
    #[error("connect failed: {0}")]
    Connect(String),

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Failed to parse a response body.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Timeout waiting for a response.
    #[error("request timed out")]
    Timeout,

    /// A configuration value was missing or out of range.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else if err.is_connect() {
            ClientError::Connect(err.to_string())
        } else {
            ClientError::Http(err.to_string())
        }
    }
}
