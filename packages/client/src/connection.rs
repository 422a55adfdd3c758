//! Connection manager: one live connection per room binding, with automatic
//! reconnection after unexpected drops.
//!
//! Each [`ConnectionHandle`] is backed by a background task that walks the
//! `Connecting → Open → Closed` state machine. The task multiplexes the
//! command channel, the transport and the reconnection timer with
//! `tokio::select!`, so an explicit close is observed in every phase.
//!
//! An unexpected close (server close, transport error, failed connect) arms
//! exactly one reconnection timer. An explicit [`ConnectionManager::close`], or
//! dropping the handle, stops the task without arming one.

use std::{
    fmt,
    sync::{
        Arc, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use tokio::sync::{mpsc, watch};

use crate::{
    config::{ClientConfig, ReconnectPolicy},
    domain::{Message, should_attempt_reconnect},
    error::ClientError,
    protocol::{OutboundMessage, ServerMessage, decode_server_message},
    transport::{Connector, Transport, WebSocketConnector},
};

/// Callback invoked with every snapshot pushed on a connection
pub type SnapshotCallback = Arc<dyn Fn(Vec<Message>) + Send + Sync>;

/// Identity of one connection instance, unique per [`ConnectionManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub fn value(self) -> u64 {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a connection handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

enum Command {
    Send(String),
    Close,
}

/// State shared between a handle and its background task.
struct Shared {
    state: watch::Sender<ConnectionState>,
    /// Set once by an explicit close; never cleared.
    closed: AtomicBool,
    callback: Mutex<Option<SnapshotCallback>>,
}

impl Shared {
    fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            state,
            closed: AtomicBool::new(false),
            callback: Mutex::new(None),
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Publish a state from the task. Once closed, only `Closed` is accepted.
    fn set_state(&self, next: ConnectionState) {
        self.state.send_if_modified(|current| {
            if *current == next || (self.is_closed() && next != ConnectionState::Closed) {
                return false;
            }
            *current = next;
            true
        });
    }

    /// Mark the handle closed and detach its callback.
    ///
    /// Returns `false` if it was already closed.
    fn mark_closed(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.state.send_replace(ConnectionState::Closed);
        self.set_callback(None);
        true
    }

    fn set_callback(&self, callback: Option<SnapshotCallback>) {
        *self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = callback;
    }

    fn deliver(&self, messages: Vec<Message>) -> bool {
        let callback = self
            .callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        match callback {
            Some(callback) => {
                callback(messages);
                true
            }
            None => false,
        }
    }
}

/// Owned token for one connection bound to one room.
///
/// Dropping the handle closes the connection just like
/// [`ConnectionManager::close`]: no reconnection survives it.
pub struct ConnectionHandle {
    id: HandleId,
    room_id: String,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
}

impl ConnectionHandle {
    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    /// Current state of the connection
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Subscribe to state changes
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Whether the owner closed this handle explicitly
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.id)
            .field("room_id", &self.room_id)
            .field("state", &self.state())
            .finish()
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if self.shared.mark_closed() {
            tracing::debug!("Connection {} dropped without explicit close", self.id);
        }
        // The task sees its command channel close and shuts the transport down.
    }
}

/// Opens and drives room connections.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    config: ClientConfig,
    next_id: AtomicU64,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, config: ClientConfig) -> Self {
        Self {
            connector,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    /// Manager opening real WebSocket connections
    pub fn websocket(config: ClientConfig) -> Self {
        Self::new(Arc::new(WebSocketConnector), config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start connecting to the room-scoped endpoint.
    ///
    /// Must be called from within a Tokio runtime. The caller must close the
    /// previous handle for the same binding before opening a new one.
    pub fn open(&self, room_id: &str) -> ConnectionHandle {
        let id = HandleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let shared = Arc::new(Shared::new());
        let (commands, command_rx) = mpsc::unbounded_channel();
        let url = self.config.room_url(room_id);

        tracing::info!("Opening connection {} to {}", id, url);

        let task = ConnectionTask {
            id,
            url,
            connector: Arc::clone(&self.connector),
            policy: self.config.reconnect,
            shared: Arc::clone(&shared),
            commands: command_rx,
        };
        tokio::spawn(task.run());

        ConnectionHandle {
            id,
            room_id: room_id.to_string(),
            shared,
            commands,
        }
    }

    /// Send a message on an open connection.
    ///
    /// Fire-and-forget: when the handle is not `Open` the message is dropped
    /// silently, and nothing is queued for a later reconnect.
    pub fn send(&self, handle: &ConnectionHandle, message: &OutboundMessage) {
        if handle.state() != ConnectionState::Open {
            tracing::debug!(
                "Connection {} is {:?}, dropping outbound message",
                handle.id,
                handle.state()
            );
            return;
        }

        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("{}", ClientError::from(e));
                return;
            }
        };

        if handle.commands.send(Command::Send(json)).is_err() {
            tracing::debug!("Connection {} task has exited, dropping message", handle.id);
        }
    }

    /// Register the snapshot callback, replacing any previous one.
    pub fn on_message<F>(&self, handle: &ConnectionHandle, callback: F)
    where
        F: Fn(Vec<Message>) + Send + Sync + 'static,
    {
        if handle.is_closed() {
            tracing::debug!("Connection {} is closed, callback not registered", handle.id);
            return;
        }
        handle.shared.set_callback(Some(Arc::new(callback)));
    }

    /// Close the connection and cancel any pending reconnection. Idempotent.
    pub fn close(&self, handle: &ConnectionHandle) {
        if !handle.shared.mark_closed() {
            return;
        }

        tracing::info!("Closing connection {} to room '{}'", handle.id, handle.room_id);

        // The task may already be gone, e.g. after giving up on reconnecting.
        let _ = handle.commands.send(Command::Close);
    }
}

/// How a phase of the connection task ended
enum Flow {
    Retry,
    Stop,
}

struct ConnectionTask {
    id: HandleId,
    url: String,
    connector: Arc<dyn Connector>,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl ConnectionTask {
    async fn run(mut self) {
        let mut failed_attempts: u32 = 0;

        loop {
            self.shared.set_state(ConnectionState::Connecting);

            let flow = match self.connect().await {
                None => Flow::Stop,
                Some(Ok(transport)) => {
                    failed_attempts = 0;
                    self.shared.set_state(ConnectionState::Open);
                    tracing::info!("Connection {} open to {}", self.id, self.url);
                    self.serve(transport).await
                }
                Some(Err(e)) => {
                    failed_attempts = failed_attempts.saturating_add(1);
                    tracing::warn!("Connection {} to {} failed: {}", self.id, self.url, e);
                    Flow::Retry
                }
            };

            self.shared.set_state(ConnectionState::Closed);

            if let Flow::Stop = flow {
                break;
            }

            if !should_attempt_reconnect(failed_attempts, self.policy.max_attempts) {
                tracing::error!(
                    "Connection {} to {} failed {} times in a row. Giving up.",
                    self.id,
                    self.url,
                    failed_attempts
                );
                break;
            }

            tracing::info!(
                "Reconnecting {} in {:?}... (attempt {})",
                self.id,
                self.policy.delay,
                failed_attempts.saturating_add(1)
            );

            if let Flow::Stop = self.wait_for_retry().await {
                break;
            }
        }

        tracing::debug!("Connection {} task exited", self.id);
    }

    /// Connect, or return `None` if the owner closed the handle meanwhile.
    async fn connect(&mut self) -> Option<Result<Box<dyn Transport>, ClientError>> {
        let connector = Arc::clone(&self.connector);
        let url = self.url.clone();
        let connecting = connector.connect(&url);
        tokio::pin!(connecting);

        loop {
            tokio::select! {
                result = &mut connecting => return Some(result),
                command = self.commands.recv() => match command {
                    Some(Command::Send(_)) => {
                        tracing::debug!("Connection {} not open yet, dropping send", self.id);
                    }
                    Some(Command::Close) | None => return None,
                },
            }
        }
    }

    async fn serve(&mut self, mut transport: Box<dyn Transport>) -> Flow {
        loop {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(Command::Send(text)) => {
                        if let Err(e) = transport.send(text).await {
                            tracing::warn!("Connection {} failed to send: {}", self.id, e);
                            return Flow::Retry;
                        }
                    }
                    Some(Command::Close) | None => {
                        if let Err(e) = transport.close().await {
                            tracing::debug!("Connection {} close failed: {}", self.id, e);
                        }
                        return Flow::Stop;
                    }
                },
                incoming = transport.recv() => match incoming {
                    Some(Ok(text)) => self.dispatch(&text),
                    Some(Err(e)) => {
                        tracing::warn!("Connection {} lost: {}", self.id, e);
                        return Flow::Retry;
                    }
                    None => {
                        tracing::info!("Server closed connection {}", self.id);
                        return Flow::Retry;
                    }
                },
            }
        }
    }

    fn dispatch(&self, text: &str) {
        match decode_server_message(text) {
            Ok(ServerMessage::Messages { messages }) => {
                tracing::debug!(
                    "Connection {} received snapshot of {} messages",
                    self.id,
                    messages.len()
                );
                if !self.shared.deliver(messages) {
                    tracing::debug!("Connection {} has no snapshot callback", self.id);
                }
            }
            Ok(ServerMessage::Unknown) => {
                tracing::debug!("Connection {} ignoring message: {}", self.id, text);
            }
            Err(e) => {
                tracing::warn!(
                    "Connection {} ignoring malformed message: {} - raw: {}",
                    self.id,
                    e,
                    text
                );
            }
        }
    }

    /// Wait out the reconnection delay unless the owner closes first.
    async fn wait_for_retry(&mut self) -> Flow {
        let delay = tokio::time::sleep(self.policy.delay);
        tokio::pin!(delay);

        loop {
            tokio::select! {
                () = &mut delay => return Flow::Retry,
                command = self.commands.recv() => match command {
                    Some(Command::Send(_)) => {
                        tracing::debug!("Connection {} is reconnecting, dropping send", self.id);
                    }
                    Some(Command::Close) | None => return Flow::Stop,
                },
            }
        }
    }
}
