//! `[watch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [watch]
//! roots = ["html", "~/notes"]   # Directories (or files) to watch recursively
//! debounce_ms = 1000            # Quiet period before a reload is sent
//! events = ["created", "modified", "moved", "deleted", "close_write"]
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actor::debounce::DEFAULT_QUIET_MS;
use crate::actor::fs::EventMask;

/// Change kinds that can trigger a reload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchEvent {
    Created,
    Modified,
    Moved,
    Deleted,
    CloseWrite,
}

impl WatchEvent {
    pub const ALL: [Self; 5] = [
        Self::Created,
        Self::Modified,
        Self::Moved,
        Self::Deleted,
        Self::CloseWrite,
    ];

    pub fn mask(self) -> EventMask {
        match self {
            Self::Created => EventMask::CREATE,
            Self::Modified => EventMask::MODIFY,
            Self::Moved => EventMask::MOVE,
            Self::Deleted => EventMask::DELETE | EventMask::DELETE_SELF,
            Self::CloseWrite => EventMask::CLOSE_WRITE,
        }
    }
}

/// File watching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Paths to watch. Relative paths resolve against the config file's
    /// directory; `~` is expanded.
    pub roots: Vec<PathBuf>,

    /// Quiet period in milliseconds.
    pub debounce_ms: u64,

    /// Change kinds forwarded to the debouncer.
    pub events: Vec<WatchEvent>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("html")],
            debounce_ms: DEFAULT_QUIET_MS,
            events: WatchEvent::ALL.to_vec(),
        }
    }
}

impl WatchConfig {
    pub fn mask(&self) -> EventMask {
        self.events
            .iter()
            .fold(EventMask::empty(), |mask, event| mask | event.mask())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_parse_config;

    #[test]
    fn test_watch_config_defaults() {
        let config = test_parse_config("");
        assert_eq!(config.watch.debounce_ms, 1000);
        assert_eq!(config.watch.mask(), EventMask::INTERESTING);
        assert_eq!(config.watch.roots.len(), 1);
        assert!(config.watch.roots[0].ends_with("html"));
    }

    #[test]
    fn test_watch_events_narrow_mask() {
        let config = test_parse_config("[watch]\nevents = [\"close_write\", \"deleted\"]");
        assert_eq!(
            config.watch.mask(),
            EventMask::CLOSE_WRITE | EventMask::DELETE | EventMask::DELETE_SELF
        );
    }

    #[test]
    fn test_watch_unknown_event_rejected() {
        let result = crate::config::LiveConfig::from_str("[watch]\nevents = [\"accessed\"]");
        assert!(result.is_err());
    }
}
