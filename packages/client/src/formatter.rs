//! Message formatting utilities for the terminal front end.

use roomchat_shared::time::timestamp_to_rfc3339;

use crate::domain::{Message, RoomIdentity};

const RULE: &str = "============================================================";

/// Message formatter for terminal display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a full snapshot of the room, oldest message first
    ///
    /// # Arguments
    ///
    /// * `identity` - The session's identity (own messages are marked "me")
    /// * `messages` - The message list to display
    /// * `received_at` - Unix timestamp when the snapshot was rendered (milliseconds)
    ///
    /// # Returns
    ///
    /// A formatted string with the whole message list
    pub fn format_snapshot(
        identity: &RoomIdentity,
        messages: &[Message],
        received_at: i64,
    ) -> String {
        let mut output = String::new();
        output.push_str(&format!("\n\n{}\n", RULE));
        output.push_str(&format!(
            "Room '{}' - updated at {}\n",
            identity.room_id,
            timestamp_to_rfc3339(received_at)
        ));
        output.push_str(&format!("{}\n", RULE));

        if messages.is_empty() {
            output.push_str("(No messages yet)\n");
        } else {
            for message in messages {
                output.push_str(&Self::format_message(message, &identity.username));
            }
        }

        output.push_str(&format!("{}\n", RULE));
        output
    }

    /// Format a single message line
    pub fn format_message(message: &Message, current_username: &str) -> String {
        let me_suffix = if message.is_from(current_username) {
            " (me)"
        } else {
            ""
        };
        format!("@{}{}: {}\n", message.username, me_suffix, message.content)
    }

    /// Format the notice printed when the session joins a room
    pub fn format_joined(identity: &RoomIdentity) -> String {
        format!(
            "\nJoined room '{}' as '{}'. Type messages and press Enter to send.\n\
             Commands: /room <id>, /name <username>, /quit\n",
            identity.room_id, identity.username
        )
    }

    /// Format the notice printed when a message cannot go out right now
    pub fn format_not_connected(room_id: &str) -> String {
        format!(
            "\n! Not connected to '{}', message was not sent (reconnecting...)\n",
            room_id
        )
    }

    /// Format a usage error for a malformed command
    pub fn format_usage(usage: &str) -> String {
        format!("\n! Usage: {}\n", usage)
    }
}
