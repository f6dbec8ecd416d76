//! Notification Message Protocol
//!
//! Messages pushed to subscribers and their server-sent event framing.
//!
//! # Wire format
//!
//! ```text
//! retry: 250            (once, when the stream opens)
//!
//! id: 7
//! data: 3               (heartbeat #3)
//!
//! id: 8
//! data: "reload"        (reload marker)
//!
//! event: close          (explicit close, understood by the client)
//! data:
//! ```
//!
//! `data` is JSON so a browser client can `JSON.parse` it and compare with
//! the reload marker.

use serde_json::Value;

/// Payload of a reload notification
pub const RELOAD_MARKER: &str = "reload";

/// Event name of an explicit close notification sent by a server
pub const CLOSE_EVENT: &str = "close";

/// Message delivered to every subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationMessage {
    /// Keep-alive with its sequence number
    Heartbeat(u64),
    /// Something changed; reload
    Reload,
}

impl NotificationMessage {
    /// JSON payload for the `data:` field.
    pub fn to_data(self) -> String {
        match self {
            Self::Heartbeat(n) => Value::from(n).to_string(),
            Self::Reload => Value::from(RELOAD_MARKER).to_string(),
        }
    }

    /// Parse a `data:` payload. Unknown payloads yield `None`.
    pub fn from_data(data: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(data.trim()).ok()? {
            Value::String(s) if s == RELOAD_MARKER => Some(Self::Reload),
            Value::Number(n) => n.as_u64().map(Self::Heartbeat),
            _ => None,
        }
    }

    pub fn is_reload(self) -> bool {
        matches!(self, Self::Reload)
    }
}

/// A message stamped with its global publish sequence number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope {
    pub id: u64,
    pub message: NotificationMessage,
}

impl Envelope {
    /// One server-sent event frame.
    pub fn to_frame(&self) -> String {
        format!("id: {}\ndata: {}\n\n", self.id, self.message.to_data())
    }
}

/// Frame advertising the client reconnect delay.
pub fn retry_frame(retry_ms: u64) -> String {
    format!("retry: {retry_ms}\n\n")
}
