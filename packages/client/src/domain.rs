//! Domain types and pure decision functions for the chat client.
//!
//! Everything here is free of I/O so the rules that drive the connection
//! and the session can be tested in isolation.

use serde::{Deserialize, Serialize};

/// Room used when none is given
pub const DEFAULT_ROOM_ID: &str = "default-room";

/// The room a session is bound to and the name it speaks as.
///
/// Only `room_id` is part of the connection key. The username travels with
/// every outbound message instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomIdentity {
    pub room_id: String,
    pub username: String,
}

impl RoomIdentity {
    pub fn new(room_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            room_id: room_id.into(),
            username: username.into(),
        }
    }
}

/// A chat message as pushed by the server.
///
/// Fields other than `username` and `content` are ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub username: String,
    pub content: String,
}

impl Message {
    pub fn new(username: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            content: content.into(),
        }
    }

    /// Whether this message was written under `username`
    pub fn is_from(&self, username: &str) -> bool {
        self.username == username
    }
}

/// Check whether composed content should be transmitted.
///
/// Content that is empty after trimming is rejected before any network call.
pub fn is_sendable(content: &str) -> bool {
    !content.trim().is_empty()
}

/// Check whether moving from `current` to `next` needs a new connection.
pub fn requires_new_connection(current: &RoomIdentity, next: &RoomIdentity) -> bool {
    current.room_id != next.room_id
}

/// Check if the connection should attempt to reconnect.
///
/// # Arguments
///
/// * `failed_attempts` - Consecutive failed attempts since the last open connection
/// * `max_attempts` - Upper bound on failed attempts, `None` for unlimited
///
/// # Returns
///
/// `true` if another attempt should be scheduled, `false` otherwise
pub fn should_attempt_reconnect(failed_attempts: u32, max_attempts: Option<u32>) -> bool {
    match max_attempts {
        Some(max) => failed_attempts < max,
        None => true,
    }
}

/// Build a `User-<n>` display name with `n` in `0..1000`.
pub fn default_username(seed: u128) -> String {
    format!("User-{}", seed % 1000)
}
