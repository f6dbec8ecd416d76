use std::path::PathBuf;

use bitflags::bitflags;

bitflags! {
    /// Mask-style flags carried by a raw filesystem event.
    ///
    /// Follows the inotify alphabet. Sources on other platforms set the
    /// closest equivalent flag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EventMask: u32 {
        const ACCESS = 1 << 0;
        const MODIFY = 1 << 1;
        const ATTRIB = 1 << 2;
        const CLOSE_WRITE = 1 << 3;
        const OPEN = 1 << 4;
        const MOVED_FROM = 1 << 5;
        const MOVED_TO = 1 << 6;
        const CREATE = 1 << 7;
        const DELETE = 1 << 8;
        const DELETE_SELF = 1 << 9;
        const MOVE_SELF = 1 << 10;
        /// Watch was dropped (bookkeeping only)
        const IGNORED = 1 << 11;
        /// Event queue overflowed, events were lost
        const OVERFLOW = 1 << 12;
        const IS_DIR = 1 << 13;

        const MOVE = Self::MOVED_FROM.bits() | Self::MOVED_TO.bits();
    }
}

impl EventMask {
    /// Every kind a caller may ask to be notified about.
    pub const INTERESTING: Self = Self::CLOSE_WRITE
        .union(Self::CREATE)
        .union(Self::MODIFY)
        .union(Self::MOVE)
        .union(Self::DELETE)
        .union(Self::DELETE_SELF);
}

/// What happened to a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Moved,
    Deleted,
}

impl ChangeKind {
    /// Pick the kind for a raw mask. Deletion wins over creation, creation
    /// over moves, moves over content changes.
    pub fn from_mask(mask: EventMask) -> Option<Self> {
        if mask.intersects(EventMask::DELETE | EventMask::DELETE_SELF) {
            Some(Self::Deleted)
        } else if mask.contains(EventMask::CREATE) {
            Some(Self::Created)
        } else if mask.intersects(EventMask::MOVE | EventMask::MOVE_SELF) {
            Some(Self::Moved)
        } else if mask.intersects(EventMask::MODIFY | EventMask::CLOSE_WRITE | EventMask::OVERFLOW)
        {
            Some(Self::Modified)
        } else {
            None
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Moved => "moved",
            Self::Deleted => "deleted",
        }
    }
}

/// A normalized change, forwarded to the debouncer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// `None` only for overflow events, which concern no single path
    pub path: Option<PathBuf>,
    pub kind: ChangeKind,
    pub mask: EventMask,
}

impl ChangeEvent {
    pub fn display_path(&self) -> String {
        self.path
            .as_ref()
            .map_or_else(|| "<overflow>".to_string(), |p| p.display().to_string())
    }
}
