//! `notify`-backed watch backend and event source.
//!
//! Every watch is installed non-recursively; recursion is the registry's job.

use std::collections::VecDeque;
use std::path::Path;

use notify::event::{
    AccessKind, AccessMode, CreateKind, EventKind, ModifyKind, RemoveKind, RenameMode,
};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::registry::RegistryView;
use super::source::{EventSource, RawEvent, WatchBackend, WatchError, WatchHandle};
use super::types::EventMask;
use crate::debug;

/// Installs watches through a `RecommendedWatcher`.
pub struct NotifyWatches {
    watcher: RecommendedWatcher,
    next_handle: u64,
}

/// Receives `notify` events and translates them into [`RawEvent`]s.
pub struct NotifyEvents {
    rx: mpsc::UnboundedReceiver<notify::Result<notify::Event>>,
    view: RegistryView,
    pending: VecDeque<RawEvent>,
}

/// Create the watcher. Events start buffering immediately.
///
/// `view` lets the source tell a deleted watched path (self-deletion) from
/// any other deletion.
pub fn open(view: RegistryView) -> Result<(NotifyWatches, NotifyEvents), WatchError> {
    let (tx, rx) = mpsc::unbounded_channel();

    // notify calls back on its own thread; an unbounded send never blocks it.
    let watcher = notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })
    .map_err(|e| WatchError::Backend(e.to_string()))?;

    Ok((
        NotifyWatches {
            watcher,
            next_handle: 0,
        },
        NotifyEvents {
            rx,
            view,
            pending: VecDeque::new(),
        },
    ))
}

impl WatchBackend for NotifyWatches {
    fn add_watch(&mut self, path: &Path) -> Result<WatchHandle, WatchError> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::from_notify(path, e))?;
        self.next_handle += 1;
        Ok(WatchHandle(self.next_handle))
    }

    fn remove_watch(&mut self, path: &Path, _handle: WatchHandle) {
        // inotify drops the watch itself when the object is deleted.
        if let Err(e) = self.watcher.unwatch(path) {
            debug!("watch"; "unwatch {}: {}", path.display(), e);
        }
    }
}

impl EventSource for NotifyEvents {
    async fn next_event(&mut self) -> Option<Result<RawEvent, WatchError>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(Ok(event));
            }
            match self.rx.recv().await? {
                Ok(event) => self.pending.extend(translate(event, &self.view)),
                Err(e) => return Some(Err(WatchError::Stream(e.to_string()))),
            }
        }
    }
}

/// Translate one `notify` event into mask-style raw events, one per path.
pub(super) fn translate(event: notify::Event, view: &RegistryView) -> Vec<RawEvent> {
    if event.need_rescan() {
        return vec![RawEvent::pathless(EventMask::OVERFLOW)];
    }

    let mask = match event.kind {
        EventKind::Create(kind) => EventMask::CREATE | dir_flag(kind == CreateKind::Folder),
        EventKind::Remove(kind) => EventMask::DELETE | dir_flag(kind == RemoveKind::Folder),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // paths = [from, to]
            let mut paths = event.paths.into_iter();
            let from = paths.next().map(|p| RawEvent::new(p, EventMask::MOVED_FROM));
            let to = paths.next().map(|p| RawEvent::new(p, EventMask::MOVED_TO));
            return from.into_iter().chain(to).collect();
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => EventMask::MOVED_FROM,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => EventMask::MOVED_TO,
        EventKind::Modify(ModifyKind::Name(_)) => EventMask::MOVE_SELF,
        EventKind::Modify(ModifyKind::Metadata(_)) => EventMask::ATTRIB,
        EventKind::Modify(_) => EventMask::MODIFY,
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => EventMask::CLOSE_WRITE,
        EventKind::Access(AccessKind::Open(_)) => EventMask::OPEN,
        EventKind::Access(_) => EventMask::ACCESS,
        EventKind::Any | EventKind::Other => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .map(|path| {
            let mut raw = RawEvent::new(path, mask);
            if mask.contains(EventMask::DELETE)
                && let Some(path) = raw.path.as_deref()
                && let Some(handle) = view.handle(path)
            {
                raw.mask |= EventMask::DELETE_SELF;
                raw.handle = Some(handle);
            }
            raw
        })
        .collect()
}

fn dir_flag(is_dir: bool) -> EventMask {
    if is_dir {
        EventMask::IS_DIR
    } else {
        EventMask::empty()
    }
}
