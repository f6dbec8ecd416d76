//! Reload Notification Transport
//!
//! Server side of the push channel:
//!
//! ```text
//! HubActor ──Envelope──> SubscriberSession ──SSE frames──> subscriber
//! ```
//!
//! # Modules
//!
//! - `message` - Notification messages and their event-stream framing
//! - `server` - HTTP endpoint that opens one stream per subscriber
//! - `session` - Drains one subscription into one stream

pub mod message;
pub mod server;
pub mod session;
