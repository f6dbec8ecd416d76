//! `[notify]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [notify]
//! interface = "127.0.0.1"   # Network interface (127.0.0.1 = localhost only)
//! port = 8008               # Port; the next free one is used if taken
//! mount = "/heartBeat"      # Path subscribers connect to
//! heartbeat_ms = 2000       # Keep-alive period
//! retry_ms = 250            # Reconnect delay advertised to subscribers
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actor::heartbeat::DEFAULT_PERIOD_MS;
use crate::client::machine::DEFAULT_RECONNECT_MS;

/// Notification endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Network interface to bind.
    /// - `127.0.0.1` (default): localhost only
    /// - `0.0.0.0`: all interfaces (LAN accessible)
    pub interface: IpAddr,
    pub port: u16,
    pub mount: String,
    pub heartbeat_ms: u64,
    pub retry_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 8008,
            mount: "/heartBeat".to_string(),
            heartbeat_ms: DEFAULT_PERIOD_MS,
            retry_ms: DEFAULT_RECONNECT_MS,
        }
    }
}

impl NotifyConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_millis(self.heartbeat_ms)
    }
}
