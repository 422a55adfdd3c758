//! Transport primitive used by the connection manager.
//!
//! [`Connector`] opens a [`Transport`] to a URL; the WebSocket implementation
//! is backed by `tokio-tungstenite`. Tests substitute scripted implementations.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

use crate::error::ClientError;

/// One established bidirectional text connection.
#[async_trait]
pub trait Transport: Send {
    /// Send a text frame
    async fn send(&mut self, text: String) -> Result<(), ClientError>;

    /// Wait for the next text frame.
    ///
    /// `None` means the peer closed the connection cleanly.
    async fn recv(&mut self) -> Option<Result<String, ClientError>>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Factory for transports, one call per connection attempt.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, ClientError>;
}

/// Connector opening WebSocket connections
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

#[async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, ClientError> {
        let (stream, response) = connect_async(url)
            .await
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        tracing::debug!(
            "WebSocket handshake with {} completed ({})",
            url,
            response.status()
        );

        Ok(Box::new(WebSocketTransport { stream }))
    }
}

/// [`Transport`] over a `tokio-tungstenite` WebSocket stream
pub struct WebSocketTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&mut self, text: String) -> Result<(), ClientError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.to_string())),
                Ok(Message::Binary(data)) => {
                    tracing::debug!("Ignoring {} bytes of binary data", data.len());
                }
                Ok(Message::Close(frame)) => {
                    tracing::debug!("Server sent close frame: {:?}", frame);
                    return None;
                }
                // ping/pong are answered by tungstenite itself
                Ok(_) => {}
                Err(e) => return Some(Err(ClientError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }
}
