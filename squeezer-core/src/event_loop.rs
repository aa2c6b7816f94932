//! The watch loop: filter, wait for stable writes, dispatch.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::dispatcher::TaskDispatcher;
use crate::error::Result;
use crate::fs_watch::{WatchEvent, WatchMessage};
use crate::layout::{DirectoryLayout, has_video_suffix};
use crate::pipeline::FileTask;
use crate::stability::StabilityDetector;

/// How the loop waits for candidates to settle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectionMode {
    /// Detection blocks the loop; later messages queue in the channel.
    #[default]
    Inline,
    /// Each candidate is watched by its own task, which dispatches once the
    /// file is stable.
    Detached,
}

/// Catch-up scanning of the incoming directory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RescanConfig {
    /// Feed files already waiting in the incoming directory through the
    /// pipeline before consuming live events.
    pub on_startup: bool,
    /// Repeat the scan on this cadence while the loop runs.
    pub interval: Option<Duration>,
}

/// True for creation events whose file name ends in `.mp4`.
pub fn is_candidate(event: &WatchEvent) -> bool {
    event.is_create() && has_video_suffix(&event.path)
}

/// Regular `.mp4` files directly inside the incoming directory that have no
/// output of the same name yet, sorted by path.
pub fn rescan_incoming(layout: &DirectoryLayout) -> Result<Vec<PathBuf>> {
    let mut pending = Vec::new();
    for entry in std::fs::read_dir(&layout.incoming)? {
        let entry = entry?;
        let path = entry.path();
        if !has_video_suffix(&path) || !entry.file_type()?.is_file() {
            continue;
        }
        let done = layout
            .output_path_for(&path)
            .map(|output| output.exists())
            .unwrap_or(true);
        if !done {
            pending.push(path);
        }
    }
    pending.sort();
    Ok(pending)
}

/// Consumes watch messages until the channel closes.
pub struct EventLoop {
    detector: StabilityDetector,
    dispatcher: TaskDispatcher,
    mode: DetectionMode,
    rescan: RescanConfig,
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("detector", &self.detector)
            .field("dispatcher", &self.dispatcher)
            .field("mode", &self.mode)
            .field("rescan", &self.rescan)
            .finish()
    }
}

impl EventLoop {
    pub fn new(detector: StabilityDetector, dispatcher: TaskDispatcher) -> Self {
        Self {
            detector,
            dispatcher,
            mode: DetectionMode::Inline,
            rescan: RescanConfig::default(),
        }
    }

    pub fn with_mode(mut self, mode: DetectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_rescan(mut self, rescan: RescanConfig) -> Self {
        self.rescan = rescan;
        self
    }

    pub async fn run(self, mut rx: mpsc::Receiver<WatchMessage>) {
        if self.rescan.on_startup {
            self.rescan_once().await;
        }

        let mut ticker = self.rescan.interval.map(|period| {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            let message = match ticker.as_mut() {
                Some(ticker) => {
                    tokio::select! {
                        message = rx.recv() => message,
                        _ = ticker.tick() => {
                            self.rescan_once().await;
                            continue;
                        }
                    }
                }
                None => rx.recv().await,
            };

            let Some(message) = message else {
                break;
            };
            self.handle_message(message).await;
        }

        info!("Watch channel closed, stopping");
    }

    pub async fn handle_message(&self, message: WatchMessage) {
        match message {
            WatchMessage::Event(event) => {
                if is_candidate(&event) {
                    info!("Detected new MP4: {}", event.path.display());
                    // New content under a name that failed before gets a fresh run
                    if let Some(name) = event.path.file_name() {
                        self.dispatcher.pipeline().failures().forget(name);
                    }
                    self.settle_and_dispatch(event.path).await;
                }
            }
            WatchMessage::Error(error) => {
                warn!("Watcher error: {}", error);
            }
        }
    }

    async fn settle_and_dispatch(&self, path: PathBuf) {
        match self.mode {
            DetectionMode::Inline => {
                settle(&self.detector, &self.dispatcher, path).await;
            }
            DetectionMode::Detached => {
                let detector = self.detector.clone();
                let dispatcher = self.dispatcher.clone();
                tokio::spawn(async move {
                    settle(&detector, &dispatcher, path).await;
                });
            }
        }
    }

    async fn rescan_once(&self) {
        let layout = self.dispatcher.pipeline().layout().clone();
        let pending = match tokio::task::spawn_blocking(move || rescan_incoming(&layout)).await {
            Ok(Ok(pending)) => pending,
            Ok(Err(err)) => {
                warn!("Rescan of incoming directory failed: {}", err);
                return;
            }
            Err(join_err) => {
                warn!("Rescan of incoming directory panicked: {}", join_err);
                return;
            }
        };

        let failures = self.dispatcher.pipeline().failures();
        let pending: Vec<PathBuf> = pending
            .into_iter()
            .filter(|path| {
                let failed = path
                    .file_name()
                    .is_some_and(|name| failures.contains(name));
                if failed {
                    debug!("rescan skipping {} (transcode failed earlier)", path.display());
                }
                !failed
            })
            .collect();

        debug!("rescan found {} pending file(s)", pending.len());
        for path in pending {
            info!("Found waiting MP4: {}", path.display());
            self.settle_and_dispatch(path).await;
        }
    }
}

async fn settle(detector: &StabilityDetector, dispatcher: &TaskDispatcher, path: PathBuf) {
    if !detector.is_stable(&path).await {
        info!("Skipping (file not stable): {}", path.display());
        return;
    }

    if is_empty_file(&path).await {
        warn!("{} is empty, compressing anyway", path.display());
    }

    // Fire-and-forget: the handle is dropped on purpose
    drop(dispatcher.dispatch(FileTask::new(path)));
}

async fn is_empty_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|meta| meta.len() == 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_need_create_and_suffix() {
        assert!(is_candidate(&WatchEvent::created("/in/a.mp4")));
        assert!(!is_candidate(&WatchEvent::other("/in/a.mp4")));
        assert!(!is_candidate(&WatchEvent::created("/in/a.txt")));
        assert!(!is_candidate(&WatchEvent::created("/in/a.MP4")));
    }

    #[test]
    fn rescan_lists_only_unprocessed_videos() {
        let tmp = tempfile::tempdir().unwrap();
        let layout = DirectoryLayout::new(
            tmp.path().join("videos"),
            tmp.path().join("compressed"),
            tmp.path().join("done"),
        );
        layout.ensure().unwrap();

        std::fs::write(layout.incoming.join("b.mp4"), b"b").unwrap();
        std::fs::write(layout.incoming.join("a.mp4"), b"a").unwrap();
        std::fs::write(layout.incoming.join("done.mp4"), b"d").unwrap();
        std::fs::write(layout.output.join("done.mp4"), b"d").unwrap();
        std::fs::write(layout.incoming.join("notes.txt"), b"n").unwrap();
        std::fs::create_dir(layout.incoming.join("folder.mp4")).unwrap();

        let pending = rescan_incoming(&layout).unwrap();
        assert_eq!(
            pending,
            vec![layout.incoming.join("a.mp4"), layout.incoming.join("b.mp4")]
        );
    }
}
