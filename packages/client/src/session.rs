//! Chat session: binds a [`RoomIdentity`] to exactly one connection handle and
//! keeps the displayed message list equal to the latest server snapshot.

use tokio::sync::mpsc;

use crate::{
    connection::{ConnectionHandle, ConnectionManager, ConnectionState, HandleId},
    domain::{Message, RoomIdentity, is_sendable, requires_new_connection},
    protocol::OutboundMessage,
};

/// A snapshot pushed on a specific connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundSnapshot {
    pub handle: HandleId,
    pub messages: Vec<Message>,
}

/// Presentation of the session's message list.
#[cfg_attr(test, mockall::automock)]
pub trait ChatView: Send {
    /// Render the whole list, oldest first, scrolled to the latest message.
    fn render(&mut self, identity: &RoomIdentity, messages: &[Message]);
}

/// Local view of one chat room: identity, message list and compose buffer.
///
/// The session is the only writer of its message list. Snapshots arrive over
/// an internal channel tagged with the handle that received them, and only
/// the current handle's snapshots are applied.
pub struct ChatSession {
    manager: ConnectionManager,
    identity: RoomIdentity,
    handle: Option<ConnectionHandle>,
    mounted: bool,
    messages: Vec<Message>,
    draft: String,
    inbox_tx: mpsc::UnboundedSender<InboundSnapshot>,
    inbox_rx: mpsc::UnboundedReceiver<InboundSnapshot>,
    view: Box<dyn ChatView>,
}

impl ChatSession {
    pub fn new(manager: ConnectionManager, identity: RoomIdentity, view: Box<dyn ChatView>) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            manager,
            identity,
            handle: None,
            mounted: false,
            messages: Vec::new(),
            draft: String::new(),
            inbox_tx,
            inbox_rx,
            view,
        }
    }

    /// Open the connection for the current room. No-op when already mounted.
    pub fn mount(&mut self) {
        if self.mounted {
            return;
        }
        self.mounted = true;
        self.connect();
    }

    pub fn identity(&self) -> &RoomIdentity {
        &self.identity
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Handle of the current connection, if mounted
    pub fn connection(&self) -> Option<&ConnectionHandle> {
        self.handle.as_ref()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.handle
            .as_ref()
            .map_or(ConnectionState::Closed, ConnectionHandle::state)
    }

    /// Switch room and/or username.
    ///
    /// A room change closes the current handle before the next one is
    /// opened and clears the message list. A username change alone keeps the
    /// connection, since the username travels with each outbound message.
    pub fn set_room_identity(&mut self, next: RoomIdentity) {
        if next == self.identity {
            return;
        }

        let reconnect = requires_new_connection(&self.identity, &next);
        tracing::info!(
            "Identity changed from {}@{} to {}@{}",
            self.identity.username,
            self.identity.room_id,
            next.username,
            next.room_id
        );
        self.identity = next;

        if reconnect {
            self.disconnect();
            self.messages.clear();
            if self.mounted {
                self.connect();
            }
        }

        self.view.render(&self.identity, &self.messages);
    }

    pub fn set_room_id(&mut self, room_id: impl Into<String>) {
        let next = RoomIdentity::new(room_id, self.identity.username.clone());
        self.set_room_identity(next);
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        let next = RoomIdentity::new(self.identity.room_id.clone(), username);
        self.set_room_identity(next);
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Send the compose buffer; see [`ChatSession::compose_and_send`].
    pub fn send_draft(&mut self) -> bool {
        let content = self.draft.clone();
        self.compose_and_send(&content)
    }

    /// Send `content` to the current room.
    ///
    /// Returns `false` without touching the network when `content` is blank.
    /// Otherwise the message is handed to the connection and the compose
    /// buffer is cleared, whether or not the server ever receives it.
    pub fn compose_and_send(&mut self, content: &str) -> bool {
        if !is_sendable(content) {
            tracing::debug!("Ignoring blank message");
            return false;
        }

        let message = OutboundMessage::new(&self.identity, content);
        match &self.handle {
            Some(handle) => self.manager.send(handle, &message),
            None => tracing::debug!("Session is not mounted, dropping message"),
        }

        self.draft.clear();
        true
    }

    /// Apply a snapshot if it came from the current handle.
    ///
    /// Returns whether the message list was replaced.
    pub fn on_snapshot(&mut self, snapshot: InboundSnapshot) -> bool {
        let current = self.handle.as_ref().map(ConnectionHandle::id);
        if current != Some(snapshot.handle) {
            tracing::debug!(
                "Ignoring stale snapshot from connection {} ({} messages)",
                snapshot.handle,
                snapshot.messages.len()
            );
            return false;
        }

        self.messages = snapshot.messages;
        self.view.render(&self.identity, &self.messages);
        true
    }

    /// Wait for the next inbound snapshot and apply it.
    ///
    /// Returns whether the message list was replaced; stale snapshots are
    /// consumed and yield `false`.
    pub async fn process_next_snapshot(&mut self) -> bool {
        // The session keeps its own sender, so the inbox never closes.
        match self.inbox_rx.recv().await {
            Some(snapshot) => self.on_snapshot(snapshot),
            None => false,
        }
    }

    /// End the session: close the connection so no reconnection outlives it.
    pub fn teardown(&mut self) {
        self.mounted = false;
        self.disconnect();
    }

    fn connect(&mut self) {
        let handle = self.manager.open(&self.identity.room_id);
        let id = handle.id();
        let inbox = self.inbox_tx.clone();

        self.manager.on_message(&handle, move |messages| {
            if inbox.send(InboundSnapshot { handle: id, messages }).is_err() {
                tracing::debug!("Session is gone, dropping snapshot from {}", id);
            }
        });

        self.handle = Some(handle);
    }

    fn disconnect(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.manager.close(&handle);
        }
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
