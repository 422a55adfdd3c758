//! Realtime room chat client.
//!
//! [`ConnectionManager`] keeps one WebSocket connection per room binding alive
//! and reconnects after unexpected drops. [`ChatSession`] binds a
//! [`RoomIdentity`] to a single connection handle and keeps the displayed
//! message list equal to the latest snapshot pushed by the server.

pub mod config;
pub mod connection;
pub mod domain;
pub mod error;
pub mod formatter;
pub mod protocol;
pub mod runner;
pub mod session;
pub mod transport;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use config::{ClientConfig, ReconnectPolicy};
pub use connection::{ConnectionHandle, ConnectionManager, ConnectionState, HandleId};
pub use domain::{Message, RoomIdentity};
pub use error::ClientError;
pub use runner::run_client;
pub use session::{ChatSession, ChatView, InboundSnapshot};
