use std::path::{Path, PathBuf};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::registry::WatchRegistry;
use super::source::{WatchBackend, WatchHandle};
use crate::debug;

/// A pending change to the watch set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchRequest {
    /// Watch `path` recursively; `root` also registers it as a root.
    Add { path: PathBuf, root: bool },
    /// Retract the watch on `path`.
    Remove {
        path: PathBuf,
        handle: Option<WatchHandle>,
    },
}

impl WatchRequest {
    pub fn add(path: impl Into<PathBuf>) -> Self {
        Self::Add {
            path: path.into(),
            root: false,
        }
    }

    pub fn add_root(path: impl Into<PathBuf>) -> Self {
        Self::Add {
            path: path.into(),
            root: true,
        }
    }

    pub fn remove(path: impl Into<PathBuf>, handle: Option<WatchHandle>) -> Self {
        Self::Remove {
            path: path.into(),
            handle,
        }
    }
}

/// Producer side of the watch queue. Never blocks.
#[derive(Debug, Clone)]
pub struct WatchRequester {
    tx: mpsc::UnboundedSender<WatchRequest>,
}

impl WatchRequester {
    /// Queue a request. Returns `false` once the consumer is gone.
    pub fn submit(&self, request: WatchRequest) -> bool {
        self.tx.send(request).is_ok()
    }

    pub fn add_root(&self, path: &Path) -> bool {
        debug!("watch"; "queueing root {}", path.display());
        self.submit(WatchRequest::add_root(path))
    }

    pub fn add(&self, path: &Path) -> bool {
        debug!("watch"; "queueing watch {}", path.display());
        self.submit(WatchRequest::add(path))
    }

    pub fn remove(&self, path: &Path, handle: Option<WatchHandle>) -> bool {
        debug!("watch"; "queueing unwatch {}", path.display());
        self.submit(WatchRequest::remove(path, handle))
    }
}

/// Single consumer of watch requests; sole writer of the registry.
///
/// Requests are applied one at a time in submission order. Follow-ups a
/// request produces (parent retries, root re-watches) go to the back of the
/// same queue.
pub struct WatchQueue<B> {
    rx: mpsc::UnboundedReceiver<WatchRequest>,
    requester: WatchRequester,
    registry: WatchRegistry<B>,
}

impl<B: WatchBackend> WatchQueue<B> {
    pub fn new(registry: WatchRegistry<B>) -> (Self, WatchRequester) {
        let (tx, rx) = mpsc::unbounded_channel();
        let requester = WatchRequester { tx };
        let queue = Self {
            rx,
            requester: requester.clone(),
            registry,
        };
        (queue, requester)
    }

    pub fn registry(&self) -> &WatchRegistry<B> {
        &self.registry
    }

    /// Run the consumer loop until cancelled.
    ///
    /// Cancellation is only observed between requests.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            let request = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                request = self.rx.recv() => match request {
                    Some(request) => request,
                    None => break,
                },
            };
            self.apply(request);
        }
        debug!("watch"; "watch queue stopped ({} watches)", self.registry.view().watch_count());
    }

    /// Apply one request and queue its follow-ups.
    pub fn apply(&mut self, request: WatchRequest) {
        let followups = match request {
            WatchRequest::Add { path, root: true } => self.registry.add_root(&path),
            WatchRequest::Add { path, root: false } => self.registry.add_recursive(&path),
            WatchRequest::Remove { path, handle } => self.registry.remove(&path, handle),
        };
        for followup in followups {
            self.requester.submit(followup);
        }
    }

    /// Apply requests until the queue is empty, follow-ups included.
    ///
    /// Returns the number of requests applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(request) = self.rx.try_recv() {
            self.apply(request);
            applied += 1;
        }
        applied
    }
}
