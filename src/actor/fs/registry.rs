use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::queue::WatchRequest;
use super::source::{WatchBackend, WatchError, WatchHandle};
use crate::{debug, log};

/// Active watches and the roots they were requested for.
#[derive(Debug, Default)]
struct WatchSet {
    entries: FxHashMap<PathBuf, WatchHandle>,
    roots: Vec<PathBuf>,
}

/// Read-only, cheaply cloneable view of the registry.
///
/// Only the queue consumer writes; anyone may read concurrently.
#[derive(Debug, Clone, Default)]
pub struct RegistryView(Arc<RwLock<WatchSet>>);

impl RegistryView {
    pub fn roots(&self) -> Vec<PathBuf> {
        self.0.read().roots.clone()
    }

    pub fn watch_count(&self) -> usize {
        self.0.read().entries.len()
    }

    pub fn is_watched(&self, path: &Path) -> bool {
        self.0.read().entries.contains_key(path)
    }

    pub fn is_root(&self, path: &Path) -> bool {
        self.0.read().roots.iter().any(|r| r == path)
    }

    pub fn handle(&self, path: &Path) -> Option<WatchHandle> {
        self.0.read().entries.get(path).copied()
    }

    /// `true` when `path` lies inside some root (or is one).
    pub fn covers(&self, path: &Path) -> bool {
        self.0.read().roots.iter().any(|r| path.starts_with(r))
    }

    /// Roots strictly below `path`.
    fn roots_below(&self, path: &Path) -> Vec<PathBuf> {
        self.0
            .read()
            .roots
            .iter()
            .filter(|r| r.starts_with(path) && r.as_path() != path)
            .cloned()
            .collect()
    }
}

/// Watch-set manager.
///
/// Responsibility:
/// - Recursively watch roots and directories that appear under a watch
/// - Re-watch roots whose watch was invalidated (deleted and recreated)
/// - Turn watch failures into skips or parent retries
///
/// Methods return follow-up requests instead of queueing them, so the queue
/// consumer stays the only place that feeds the queue from inside.
pub struct WatchRegistry<B> {
    backend: B,
    view: RegistryView,
}

impl<B: WatchBackend> WatchRegistry<B> {
    pub fn new(backend: B, view: RegistryView) -> Self {
        Self { backend, view }
    }

    pub fn view(&self) -> &RegistryView {
        &self.view
    }

    /// Register `path` as a root, then watch its whole tree.
    ///
    /// Registering an existing root again does not duplicate it.
    pub fn add_root(&mut self, path: &Path) -> Vec<WatchRequest> {
        {
            let mut set = self.view.0.write();
            if !set.roots.iter().any(|r| r == path) {
                debug!("watch"; "adding root path {}", path.display());
                set.roots.push(path.to_path_buf());
            }
        }
        self.add_recursive(path)
    }

    /// Watch `path` and every directory below it, depth-first.
    ///
    /// Inside a root the whole subtree is enumerated; already watched
    /// directories are listed again so that children missed earlier get
    /// watched. Outside every root only the way toward roots that are not
    /// watched yet is followed, and anything else is ignored.
    pub fn add_recursive(&mut self, path: &Path) -> Vec<WatchRequest> {
        if self.view.covers(path) {
            return self.enumerate(path);
        }

        let pending = self.view.roots_below(path);
        if pending.is_empty() {
            debug!("watch"; "{} is outside every root, ignoring", path.display());
            return Vec::new();
        }
        self.approach(path, &pending)
    }

    /// Retract the watch on `path` and every watch below it.
    ///
    /// A root is never dropped from the root set; it is scheduled to be
    /// watched again instead.
    pub fn remove(&mut self, path: &Path, handle: Option<WatchHandle>) -> Vec<WatchRequest> {
        let pruned: Vec<(PathBuf, WatchHandle)> = {
            let mut set = self.view.0.write();
            let stale: Vec<PathBuf> = set
                .entries
                .keys()
                .filter(|p| p.starts_with(path))
                .cloned()
                .collect();
            stale
                .into_iter()
                .filter_map(|p| set.entries.remove(&p).map(|h| (p, h)))
                .collect()
        };

        if pruned.is_empty()
            && let Some(handle) = handle
        {
            self.backend.remove_watch(path, handle);
        }
        for (stale, handle) in &pruned {
            self.backend.remove_watch(stale, *handle);
            debug!("watch"; "unwatching {}", stale.display());
        }

        let mut rewatch: Vec<PathBuf> = self
            .view
            .roots()
            .into_iter()
            .filter(|r| r.starts_with(path))
            .collect();
        rewatch.sort();
        rewatch
            .into_iter()
            .map(|root| {
                debug!("watch"; "root path removed, re-watching {}", root.display());
                WatchRequest::add(root)
            })
            .collect()
    }

    fn enumerate(&mut self, path: &Path) -> Vec<WatchRequest> {
        let mut retries = Vec::new();
        let mut stack = vec![path.to_path_buf()];

        while let Some(current) = stack.pop() {
            match self.watch_one(&current) {
                Ok(Visit::Descend) => {}
                Ok(Visit::Skip) => continue,
                Err(e) => {
                    retries.extend(on_watch_error(&current, e));
                    continue;
                }
            }

            match child_dirs(&current) {
                Ok(children) => stack.extend(children.into_iter().rev()),
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    debug!("watch"; "cannot list {}, skipping children", current.display());
                }
                Err(e) => {
                    // Replaced or removed mid-enumeration.
                    debug!("watch"; "listing {} failed: {}", current.display(), e);
                    retries.extend(parent_retry(&current));
                }
            }
        }

        retries
    }

    /// Watch an ancestor of `pending` roots on its own, then step one level
    /// toward each of them. Steps that do not exist yet are left to the
    /// creation event the ancestor's watch will report.
    fn approach(&mut self, path: &Path, pending: &[PathBuf]) -> Vec<WatchRequest> {
        if let Err(e) = self.watch_one(path) {
            return on_watch_error(path, e).into_iter().collect();
        }

        let mut steps: Vec<PathBuf> = pending
            .iter()
            .filter_map(|root| {
                let first = root.strip_prefix(path).ok()?.components().next()?;
                Some(path.join(first))
            })
            .collect();
        steps.sort();
        steps.dedup();

        let mut retries = Vec::new();
        for step in steps {
            if fs::symlink_metadata(&step).is_err() {
                debug!("watch"; "waiting for {} to appear", step.display());
                continue;
            }
            retries.extend(self.add_recursive(&step));
        }
        retries
    }

    /// Install a watch on a single path, unless it has one already.
    ///
    /// Directories are descended into; files are only watched when they are
    /// roots themselves (a directory watch already reports its files).
    fn watch_one(&mut self, path: &Path) -> Result<Visit, WatchError> {
        let meta = fs::symlink_metadata(path).map_err(|e| WatchError::from_io(path, &e))?;
        let is_dir = path.is_dir();

        if !is_dir && !self.view.is_root(path) {
            return Ok(Visit::Skip);
        }
        if !self.view.is_watched(path) {
            let handle = self.backend.add_watch(path)?;
            self.view.0.write().entries.insert(path.to_path_buf(), handle);
            debug!("watch"; "watching {}", path.display());
        }

        // Symlinked directories are watched but not followed.
        if is_dir && !meta.file_type().is_symlink() {
            Ok(Visit::Descend)
        } else {
            Ok(Visit::Skip)
        }
    }
}

enum Visit {
    Descend,
    Skip,
}

/// Skip on permission denied, retry through the parent on a transient
/// failure. Backend failures (watch limit reached) are not retried.
fn on_watch_error(path: &Path, err: WatchError) -> Option<WatchRequest> {
    match err {
        WatchError::PermissionDenied(p) => {
            debug!("watch"; "permission denied, skipping {}", p.display());
            None
        }
        WatchError::Transient { .. } => {
            debug!("watch"; "{}", err);
            parent_retry(path)
        }
        WatchError::Backend(_) | WatchError::Stream(_) => {
            log!("watch"; "{}", err);
            None
        }
    }
}

fn parent_retry(path: &Path) -> Option<WatchRequest> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(WatchRequest::add)
}

/// Subdirectories of `dir`, sorted, symlinks excluded.
fn child_dirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}
