//! Wire DTOs for the room chat WebSocket protocol.
//!
//! - Server → client: `{"type": "messages", "messages": [...]}`, always a full snapshot
//! - Client → server: `{"username", "content", "room_id"}`, no `type` field

use serde::{Deserialize, Serialize};

use crate::domain::{Message, RoomIdentity};

/// Messages pushed by the server.
///
/// Any `type` other than `messages` decodes to [`ServerMessage::Unknown`] so
/// newer server pushes are ignored rather than treated as failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "messages")]
    Messages { messages: Vec<Message> },
    #[serde(other)]
    Unknown,
}

/// Message sent by the client to its room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub username: String,
    pub content: String,
    pub room_id: String,
}

impl OutboundMessage {
    pub fn new(identity: &RoomIdentity, content: impl Into<String>) -> Self {
        Self {
            username: identity.username.clone(),
            content: content.into(),
            room_id: identity.room_id.clone(),
        }
    }
}

/// Decode a text frame pushed by the server.
pub fn decode_server_message(text: &str) -> Result<ServerMessage, serde_json::Error> {
    serde_json::from_str(text)
}
