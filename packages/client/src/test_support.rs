//! Scripted transport used by the unit tests.
//!
//! [`MockConnector`] hands the server side of every accepted connection to
//! the test as a [`MockServer`], which can push frames, read what the client
//! sent, and drop the connection.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{
    domain::Message,
    error::ClientError,
    transport::{Connector, Transport},
};

enum Script {
    Refuse,
    AcceptAfter(Duration),
}

pub(crate) struct MockConnector {
    script: Mutex<VecDeque<Script>>,
    urls: Mutex<Vec<String>>,
    servers: mpsc::UnboundedSender<MockServer>,
}

impl MockConnector {
    pub(crate) fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<MockServer>) {
        let (servers, server_rx) = mpsc::unbounded_channel();
        let connector = Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            urls: Mutex::new(Vec::new()),
            servers,
        });
        (connector, server_rx)
    }

    /// Fail the next `count` connection attempts
    pub(crate) fn refuse_next(&self, count: usize) {
        let mut script = self.script.lock().unwrap();
        script.extend((0..count).map(|_| Script::Refuse));
    }

    /// Accept the next connection attempt only after `delay`
    pub(crate) fn delay_next(&self, delay: Duration) {
        self.script
            .lock()
            .unwrap()
            .push_back(Script::AcceptAfter(delay));
    }

    pub(crate) fn attempts(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, ClientError> {
        self.urls.lock().unwrap().push(url.to_string());
        let step = self.script.lock().unwrap().pop_front();

        match step {
            Some(Script::Refuse) => {
                return Err(ClientError::Connection("connection refused".to_string()));
            }
            Some(Script::AcceptAfter(delay)) => tokio::time::sleep(delay).await,
            None => {}
        }

        let (incoming_tx, incoming) = mpsc::unbounded_channel();
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let server = MockServer {
            url: url.to_string(),
            incoming: incoming_tx,
            outgoing: outgoing_rx,
            closed: Arc::clone(&closed),
        };
        // The test may not care about the server side.
        let _ = self.servers.send(server);

        Ok(Box::new(MockTransport {
            incoming,
            outgoing,
            closed,
        }))
    }
}

struct MockTransport {
    incoming: mpsc::UnboundedReceiver<String>,
    outgoing: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, text: String) -> Result<(), ClientError> {
        self.outgoing
            .send(text)
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Option<Result<String, ClientError>> {
        self.incoming.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Server side of one mock connection.
pub(crate) struct MockServer {
    pub(crate) url: String,
    incoming: mpsc::UnboundedSender<String>,
    outgoing: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl MockServer {
    /// Push a text frame; ignored once the client has dropped the transport
    pub(crate) fn push(&self, text: &str) {
        let _ = self.incoming.send(text.to_string());
    }

    pub(crate) fn push_snapshot(&self, messages: &[Message]) {
        let snapshot = serde_json::json!({ "type": "messages", "messages": messages });
        self.push(&snapshot.to_string());
    }

    pub(crate) async fn next_sent(&mut self) -> String {
        self.outgoing.recv().await.unwrap()
    }

    pub(crate) fn try_next_sent(&mut self) -> Option<String> {
        self.outgoing.try_recv().ok()
    }

    /// Whether the client closed this connection
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Simulate the server going away
    pub(crate) fn drop_connection(self) {
        drop(self);
    }
}
