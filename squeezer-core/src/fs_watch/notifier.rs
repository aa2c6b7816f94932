use std::fmt;
use std::path::{Path, PathBuf};

use notify::{Config as NotifyConfig, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

use super::{WatchMessage, convert_event};
use crate::error::{Result, SqueezeError};

/// Default channel capacity between the notify callback and the event loop.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Live watch on one directory. Dropping it stops the watch and closes the
/// message channel once buffered messages are drained.
pub struct FsNotifier {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl fmt::Debug for FsNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FsNotifier")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl FsNotifier {
    /// Watch `root` (non-recursively). Failing to create or register the
    /// watcher is reported as [`SqueezeError::Watch`].
    pub fn watch(
        root: &Path,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<WatchMessage>)> {
        let (tx, rx) = mpsc::channel::<WatchMessage>(capacity.max(1));
        let root_display = root.display().to_string();

        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for watch_event in convert_event(event) {
                        if let Err(err) = tx.blocking_send(WatchMessage::Event(watch_event)) {
                            warn!("fs_watch channel send failed for {}: {}", root_display, err);
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = tx.blocking_send(WatchMessage::Error(err.to_string()));
                }
            },
            NotifyConfig::default(),
        )
        .map_err(|err| {
            SqueezeError::Watch(format!(
                "failed to create watcher for {}: {}",
                root.display(),
                err
            ))
        })?;

        watcher
            .watch(root, RecursiveMode::NonRecursive)
            .map_err(|err| {
                SqueezeError::Watch(format!("failed to watch {}: {}", root.display(), err))
            })?;

        Ok((
            Self {
                root: root.to_path_buf(),
                _watcher: watcher,
            },
            rx,
        ))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
