//! `[client]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [client]
//! url = "http://127.0.0.1:8008/heartBeat"
//! reconnect_ms = 250
//! command = "pkill -HUP my-viewer"   # Run on every reload (optional)
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::machine::DEFAULT_RECONNECT_MS;

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub url: String,
    pub reconnect_ms: u64,
    /// Shell command run on reload; the reload is only logged when unset.
    pub command: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8008/heartBeat".to_string(),
            reconnect_ms: DEFAULT_RECONNECT_MS,
            command: None,
        }
    }
}

impl ClientConfig {
    pub fn reconnect(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }
}

#[cfg(test)]
mod tests {
    use crate::config::test_parse_config;

    #[test]
    fn test_client_config() {
        let config = test_parse_config("[client]\ncommand = \"true\"\nreconnect_ms = 1000");
        assert_eq!(config.client.command.as_deref(), Some("true"));
        assert_eq!(config.client.reconnect_ms, 1000);
        assert_eq!(config.client.url, "http://127.0.0.1:8008/heartBeat");
    }
}
