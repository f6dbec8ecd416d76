//! FileSystem Actor
//!
//! Keeps a recursive watch set consistent with the live directory tree and
//! turns filesystem activity into debounce signals.
//!
//! Architecture:
//! ```text
//! EventSource → FsEventStream → DebounceActor
//!                    │
//!                    └──requests──> WatchQueue → WatchRegistry → WatchBackend
//! ```

use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

use super::debounce::DebounceHandle;
use crate::{debug, log, logger};

// notify-backed backend and event source.
pub mod notify_source;
// Serialized add/remove requests (single consumer).
pub mod queue;
// Watch set and recursive enumeration.
pub mod registry;
// Backend/source traits and watch errors.
pub mod source;
// Raw events -> filtered change events.
pub mod stream;
// Event masks and change kinds.
pub mod types;


pub use queue::{WatchQueue, WatchRequest, WatchRequester};
pub use registry::{RegistryView, WatchRegistry};
pub use source::{EventSource, RawEvent, WatchBackend, WatchError, WatchHandle};
pub use stream::FsEventStream;
pub use types::{ChangeEvent, ChangeKind, EventMask};

/// FileSystem Actor - forwards interesting changes to the debouncer
pub struct FsActor<S> {
    stream: FsEventStream<S>,
    debounce: DebounceHandle,
}

impl<S: EventSource> FsActor<S> {
    pub fn new(stream: FsEventStream<S>, debounce: DebounceHandle) -> Self {
        Self { stream, debounce }
    }

    /// Run until the stream ends.
    ///
    /// A source failure ends the pipeline: no further reloads will be sent,
    /// everything else keeps running.
    pub async fn run(mut self) -> Result<(), WatchError> {
        loop {
            match self.stream.next().await {
                Ok(Some(event)) => {
                    debug!("watch"; "{}: {}", event.kind.label(), event.display_path());
                    if !self.debounce.signal() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    log!("error"; "watch pipeline stopped: {}", e);
                    logger::status_error("auto-reload disabled", &e.to_string());
                    return Err(e);
                }
            }
        }
        debug!("watch"; "fs actor stopped");
        Ok(())
    }
}

/// Watch pipeline over the platform watcher, ready to run.
pub struct WatchPipeline<B, S> {
    pub queue: WatchQueue<B>,
    pub actor: FsActor<S>,
    pub view: RegistryView,
}

/// Open the platform watcher and queue every root.
///
/// Roots that do not exist yet are accepted; they are watched once
/// something creates them.
pub fn open_pipeline(
    roots: &[PathBuf],
    interesting: EventMask,
    debounce: DebounceHandle,
    cancel: CancellationToken,
) -> Result<WatchPipeline<notify_source::NotifyWatches, notify_source::NotifyEvents>, WatchError>
{
    let view = RegistryView::default();
    let (watches, events) = notify_source::open(view.clone())?;
    Ok(build_pipeline(
        watches,
        events,
        view,
        roots,
        interesting,
        debounce,
        cancel,
    ))
}

/// Wire a pipeline from any backend/source pair.
pub fn build_pipeline<B: WatchBackend, S: EventSource>(
    backend: B,
    source: S,
    view: RegistryView,
    roots: &[PathBuf],
    interesting: EventMask,
    debounce: DebounceHandle,
    cancel: CancellationToken,
) -> WatchPipeline<B, S> {
    let registry = WatchRegistry::new(backend, view.clone());
    let (queue, requester) = WatchQueue::new(registry);

    for root in roots {
        requester.add_root(root);
    }

    let stream = FsEventStream::new(source, requester, view.clone(), interesting, cancel);
    WatchPipeline {
        queue,
        actor: FsActor::new(stream, debounce),
        view,
    }
}
