//! Actor System for Change Notification
//!
//! Message-passing concurrency for serve mode:
//!
//! ```text
//! FsActor --> DebounceActor --> HubActor --> subscriber sessions
//! (watch)     (quiet window)    (fan-out)
//!                                  ^
//!                HeartbeatActor ───┘
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - Recursive watch set and change events
//! - `debounce` - Collapses change bursts into one reload
//! - `heartbeat` - Periodic liveness messages
//! - `hub` - Subscriber registry and broadcast
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod debounce;
pub mod fs;
pub mod heartbeat;
pub mod hub;
pub mod messages;

pub use coordinator::Coordinator;
