//! Platform seams: where watches are installed and where raw events come from.
//!
//! The registry only talks to a [`WatchBackend`], the event stream only to an
//! [`EventSource`]. `notify_source` implements both on top of `notify`;
//! the tests implement them in memory.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::EventMask;

/// Opaque handle of one low-level watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub u64);

/// One platform event, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub path: Option<PathBuf>,
    pub mask: EventMask,
    /// Watch the event was reported on, when the source knows it
    pub handle: Option<WatchHandle>,
}

impl RawEvent {
    pub fn new(path: impl Into<PathBuf>, mask: EventMask) -> Self {
        Self {
            path: Some(path.into()),
            mask,
            handle: None,
        }
    }

    pub fn pathless(mask: EventMask) -> Self {
        Self {
            path: None,
            mask,
            handle: None,
        }
    }
}

/// Watch-related errors
#[derive(Debug, Error)]
pub enum WatchError {
    /// Path exists but may not be watched; skipped.
    #[error("permission denied watching `{}`", .0.display())]
    PermissionDenied(PathBuf),

    /// Path vanished or is not fully created yet; retried via its parent.
    #[error("cannot watch `{}` yet: {reason}", path.display())]
    Transient { path: PathBuf, reason: String },

    /// The watch facility itself could not be set up.
    #[error("watch backend failed: {0}")]
    Backend(String),

    /// The event source failed; the watch pipeline cannot continue.
    #[error("event stream failed: {0}")]
    Stream(String),
}

impl WatchError {
    /// Map an io error met while touching `path` onto the watch taxonomy.
    pub fn from_io(path: &Path, err: &io::Error) -> Self {
        if err.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied(path.to_path_buf())
        } else {
            Self::Transient {
                path: path.to_path_buf(),
                reason: err.to_string(),
            }
        }
    }

    /// Map a `notify` error met while watching `path`.
    pub fn from_notify(path: &Path, err: notify::Error) -> Self {
        match &err.kind {
            notify::ErrorKind::Io(io) => Self::from_io(path, io),
            notify::ErrorKind::PathNotFound | notify::ErrorKind::WatchNotFound => {
                Self::Transient {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                }
            }
            // Watch limit reached, bad configuration.
            _ => Self::Backend(format!("`{}`: {}", path.display(), err)),
        }
    }
}

/// Installs and retracts low-level watches. Owned by the registry.
pub trait WatchBackend: Send + 'static {
    /// Watch a single path (non-recursive).
    fn add_watch(&mut self, path: &Path) -> Result<WatchHandle, WatchError>;

    /// Retract a watch. The platform may already have dropped it.
    fn remove_watch(&mut self, path: &Path, handle: WatchHandle);
}

/// Lazy, infinite, non-restartable sequence of raw events.
pub trait EventSource: Send + 'static {
    /// Wait for the next raw event. `None` once the source is exhausted.
    ///
    /// Must be cancel-safe: dropping the future loses no event.
    fn next_event(&mut self) -> impl Future<Output = Option<Result<RawEvent, WatchError>>> + Send;
}
