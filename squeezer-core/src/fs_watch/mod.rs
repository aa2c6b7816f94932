//! Filesystem notifications for the incoming directory.
//!
//! A thin wrapper around `notify` that flattens raw notifications into
//! [`WatchEvent`]s and forwards them, together with watcher errors, over a
//! single tokio channel of [`WatchMessage`]s.

use std::fmt;
use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind};

pub mod notifier;

pub use notifier::FsNotifier;

/// Whether a notification announced a new entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatchEventKind {
    Create,
    Other,
}

/// One path touched by the filesystem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: WatchEventKind,
}

impl WatchEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: WatchEventKind::Create,
        }
    }

    pub fn other(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: WatchEventKind::Other,
        }
    }

    pub fn is_create(&self) -> bool {
        self.kind == WatchEventKind::Create
    }
}

/// Item delivered to the event loop.
#[derive(Clone, PartialEq, Eq)]
pub enum WatchMessage {
    Event(WatchEvent),
    Error(String),
}

impl fmt::Debug for WatchMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchMessage::Event(event) => f
                .debug_struct("WatchMessage::Event")
                .field("kind", &event.kind)
                .field("path", &event.path)
                .finish(),
            WatchMessage::Error(message) => f
                .debug_struct("WatchMessage::Error")
                .field("message", message)
                .finish(),
        }
    }
}

/// Kind of a single-path notification. Rename destinations count as
/// creations so files moved into the directory are picked up; rename
/// sources do not.
pub fn classify_event(kind: &EventKind) -> WatchEventKind {
    match kind {
        EventKind::Create(_) => WatchEventKind::Create,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => WatchEventKind::Create,
        _ => WatchEventKind::Other,
    }
}

/// One [`WatchEvent`] per path carried by the notification.
pub fn convert_event(event: Event) -> Vec<WatchEvent> {
    match event.kind {
        // Paths are [from, to]
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .into_iter()
            .enumerate()
            .map(|(index, path)| WatchEvent {
                path,
                kind: if index == 1 {
                    WatchEventKind::Create
                } else {
                    WatchEventKind::Other
                },
            })
            .collect(),
        kind => {
            let kind = classify_event(&kind);
            event
                .paths
                .into_iter()
                .map(|path| WatchEvent { path, kind })
                .collect()
        }
    }
}
