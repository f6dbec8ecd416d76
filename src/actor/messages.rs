//! Actor Message Definitions
//!
//! ```text
//! DebounceActor ──Publish(Reload)────┐
//! HeartbeatActor ─Publish(Heartbeat)─┼──> HubActor ──Envelope──> sessions
//! sessions ──Subscribe/Unsubscribe───┘
//! ```

use crossbeam::channel::Sender;

use crate::reload::message::{Envelope, NotificationMessage};

/// Identifier of one subscriber session
pub type SessionId = u64;

/// Messages to Hub Actor
#[derive(Debug)]
pub enum HubMsg {
    /// Start delivering to a new session queue
    Subscribe {
        id: SessionId,
        queue: Sender<Envelope>,
    },
    /// Drop a session queue
    Unsubscribe(SessionId),
    /// Broadcast to every active session
    Publish(NotificationMessage),
}
