//! Client configuration: server endpoint and reconnection policy.

use std::time::Duration;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::error::ClientError;

/// Server used when no URL is given
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8000";

/// Delay between a dropped connection and the next attempt
pub const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Bytes a browser escapes in a URL path; non-ASCII is always escaped
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// How a connection recovers after an unexpected close.
///
/// The default retries forever at a fixed interval. `max_attempts` bounds the
/// number of consecutive failed attempts; the counter resets whenever a
/// connection reaches the open state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(RECONNECT_INTERVAL_SECS),
            max_attempts: None,
        }
    }
}

/// Configuration shared by every connection a [`crate::ConnectionManager`] opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    server_url: String,
    pub reconnect: ReconnectPolicy,
}

impl ClientConfig {
    /// Create a configuration for the given server base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] unless the URL uses the `ws://` or
    /// `wss://` scheme.
    pub fn new(server_url: impl Into<String>) -> Result<Self, ClientError> {
        let server_url = server_url.into();
        if !(server_url.starts_with("ws://") || server_url.starts_with("wss://")) {
            return Err(ClientError::InvalidUrl(server_url));
        }

        Ok(Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            reconnect: ReconnectPolicy::default(),
        })
    }

    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect.delay = delay;
        self
    }

    #[must_use]
    pub fn with_max_reconnect_attempts(mut self, max_attempts: u32) -> Self {
        self.reconnect.max_attempts = Some(max_attempts);
        self
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Room-scoped chat endpoint, `{server_url}/ws/chat/{room_id}`.
    ///
    /// The room id is percent-encoded, so names with spaces or non-ASCII
    /// text still form a valid URI.
    pub fn room_url(&self, room_id: &str) -> String {
        format!(
            "{}/ws/chat/{}",
            self.server_url,
            utf8_percent_encode(room_id, PATH_SEGMENT)
        )
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}
