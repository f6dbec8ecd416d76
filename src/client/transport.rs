//! Event-stream transport for the listener.

use std::future::Future;

use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::retry::Never;
use reqwest_eventsource::{Event as SseEvent, EventSource};

/// What the transport observed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message { event: String, data: String },
    Error(String),
}

/// A connection the reconnect machine can drive.
pub trait Transport: Send {
    /// Start a connection. Progress arrives through [`next_event`](Self::next_event).
    fn connect(&mut self) -> anyhow::Result<()>;

    /// Drop the current connection, if any.
    fn teardown(&mut self);

    /// `true` while a connection exists.
    fn is_active(&self) -> bool;

    /// Wait for the next event of the current connection.
    ///
    /// Must be cancel-safe.
    fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send;
}

/// Server-sent events over HTTP.
///
/// Reconnection is left to the state machine, so the built-in retry of the
/// event source is disabled.
pub struct SseTransport {
    client: Client,
    url: String,
    source: Option<EventSource>,
}

impl SseTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            source: None,
        }
    }
}

impl Transport for SseTransport {
    fn connect(&mut self) -> anyhow::Result<()> {
        self.teardown();
        let mut source = EventSource::new(self.client.get(&self.url))
            .map_err(|e| anyhow::anyhow!("cannot open {}: {}", self.url, e))?;
        source.set_retry_policy(Box::new(Never));
        self.source = Some(source);
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.close();
        }
    }

    fn is_active(&self) -> bool {
        self.source.is_some()
    }

    async fn next_event(&mut self) -> TransportEvent {
        let Some(source) = self.source.as_mut() else {
            return std::future::pending().await;
        };
        match source.next().await {
            Some(Ok(SseEvent::Open)) => TransportEvent::Opened,
            Some(Ok(SseEvent::Message(msg))) => TransportEvent::Message {
                event: msg.event,
                data: msg.data,
            },
            Some(Err(e)) => TransportEvent::Error(e.to_string()),
            None => TransportEvent::Error("stream ended".into()),
        }
    }
}
