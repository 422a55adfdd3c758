//! Error types for the roomchat client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),

    /// Established connection failed while sending or receiving
    #[error("Transport error: {0}")]
    Transport(String),

    /// Server URL is not a usable WebSocket URL
    #[error("Invalid server URL '{0}'")]
    InvalidUrl(String),

    /// Outbound payload could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
