//! Configuration section definitions.
//!
//! Each module corresponds to a section in `livewatch.toml`:
//!
//! | Module   | TOML Section | Purpose                                  |
//! |----------|--------------|------------------------------------------|
//! | `watch`  | `[watch]`    | Watch roots, quiet period, event kinds   |
//! | `notify` | `[notify]`   | Event-stream endpoint and heartbeat      |
//! | `client` | `[client]`   | Listener URL, reconnect delay, action    |

mod client;
mod notify;
mod watch;

pub use client::ClientConfig;
pub use notify::NotifyConfig;
pub use watch::{WatchConfig, WatchEvent};
