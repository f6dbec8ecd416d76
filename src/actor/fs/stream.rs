use tokio_util::sync::CancellationToken;

use super::queue::WatchRequester;
use super::registry::RegistryView;
use super::source::{EventSource, RawEvent, WatchError};
use super::types::{ChangeEvent, ChangeKind, EventMask};
use crate::debug;

/// Filtered change events, with watch-set bookkeeping applied on the way.
///
/// For every raw event:
/// - creations (and moves into a watched directory) request a watch, so new
///   subdirectories are covered before files appear inside them
/// - self-deletions and watched paths moved away request an unwatch, which
///   re-watches roots
/// - only kinds in the interesting mask, on paths inside a root, are yielded
pub struct FsEventStream<S> {
    source: S,
    requests: WatchRequester,
    scope: RegistryView,
    interesting: EventMask,
    cancel: CancellationToken,
    finished: bool,
}

impl<S: EventSource> FsEventStream<S> {
    pub fn new(
        source: S,
        requests: WatchRequester,
        scope: RegistryView,
        interesting: EventMask,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            requests,
            scope,
            interesting,
            cancel,
            finished: false,
        }
    }

    /// Next interesting change.
    ///
    /// `Ok(None)` once stopped or the source is exhausted; an `Err` is fatal
    /// and every later call returns `Ok(None)`.
    pub async fn next(&mut self) -> Result<Option<ChangeEvent>, WatchError> {
        loop {
            if self.finished || self.cancel.is_cancelled() {
                self.finished = true;
                return Ok(None);
            }

            let raw = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                raw = self.source.next_event() => raw,
            };

            let raw = match raw {
                Some(Ok(raw)) => raw,
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(e);
                }
                None => {
                    self.finished = true;
                    return Ok(None);
                }
            };

            // Stop flag is checked before yielding, never mid-event.
            if self.cancel.is_cancelled() {
                self.finished = true;
                return Ok(None);
            }

            if let Some(event) = self.reconcile(raw) {
                return Ok(Some(event));
            }
        }
    }

    fn reconcile(&self, raw: RawEvent) -> Option<ChangeEvent> {
        if let Some(path) = &raw.path {
            if raw.mask.intersects(EventMask::CREATE | EventMask::MOVED_TO) {
                self.requests.add(path);
            }
            if raw.mask.contains(EventMask::DELETE_SELF) {
                self.requests.remove(path, raw.handle);
            } else if raw.mask.intersects(EventMask::MOVED_FROM | EventMask::MOVE_SELF)
                && self.scope.is_watched(path)
            {
                // Stale once moved; a directory recreated here needs a new watch.
                self.requests.remove(path, None);
            }

            // Ancestors watched on the way to a missing root report siblings too.
            if !self.scope.covers(path) {
                debug!("watch"; "outside every root: {:?} {}", raw.mask, path.display());
                return None;
            }
        }

        let forward = raw.mask.intersects(self.interesting | EventMask::OVERFLOW);
        let kind = ChangeKind::from_mask(raw.mask & (self.interesting | EventMask::OVERFLOW));
        match (forward, kind) {
            (true, Some(kind)) => Some(ChangeEvent {
                path: raw.path,
                kind,
                mask: raw.mask,
            }),
            _ => {
                debug!("watch"; "unyielded event {:?} {:?}", raw.mask, raw.path);
                None
            }
        }
    }
}
