use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::dispatcher::{TaskDispatcher, TaskReport};
use crate::error::Result;
use crate::event_loop::{DetectionMode, EventLoop, RescanConfig};
use crate::fs_watch::WatchMessage;
use crate::fs_watch::notifier::{DEFAULT_CHANNEL_CAPACITY, FsNotifier};
use crate::layout::DirectoryLayout;
use crate::pipeline::ProcessingPipeline;
use crate::stability::{StabilityConfig, StabilityDetector};
use crate::transcoder::Transcoder;

/// Everything the service needs besides the transcoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceSettings {
    pub layout: DirectoryLayout,
    pub stability: StabilityConfig,
    pub detection: DetectionMode,
    /// `None` keeps pipeline concurrency unbounded.
    pub max_concurrent_jobs: Option<usize>,
    pub rescan: RescanConfig,
    pub channel_capacity: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            layout: DirectoryLayout::default(),
            stability: StabilityConfig::default(),
            detection: DetectionMode::Inline,
            max_concurrent_jobs: None,
            rescan: RescanConfig::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Startup glue: directories, watch registration, event loop.
pub struct SqueezeService {
    settings: ServiceSettings,
    transcoder: Arc<dyn Transcoder>,
    reports: Option<mpsc::UnboundedSender<TaskReport>>,
}

impl fmt::Debug for SqueezeService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqueezeService")
            .field("settings", &self.settings)
            .field("transcoder", &"Transcoder")
            .field("reports", &self.reports.is_some())
            .finish()
    }
}

impl SqueezeService {
    pub fn new(settings: ServiceSettings, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            settings,
            transcoder,
            reports: None,
        }
    }

    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<TaskReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    /// Create the directories and register the watch. Errors here are fatal
    /// for the process; nothing after this point is.
    pub fn start(self) -> Result<RunningService> {
        let layout = &self.settings.layout;
        layout.ensure()?;

        let (notifier, rx) =
            FsNotifier::watch(&layout.incoming, self.settings.channel_capacity)?;
        info!("Watching folder: {}", layout.incoming.display());

        let pipeline = Arc::new(ProcessingPipeline::new(
            self.settings.layout.clone(),
            self.transcoder,
        ));
        let mut dispatcher =
            TaskDispatcher::new(pipeline).with_max_concurrent(self.settings.max_concurrent_jobs);
        if let Some(reports) = self.reports {
            dispatcher = dispatcher.with_reports(reports);
        }

        let event_loop = EventLoop::new(StabilityDetector::new(self.settings.stability), dispatcher)
            .with_mode(self.settings.detection)
            .with_rescan(self.settings.rescan);

        Ok(RunningService {
            notifier,
            event_loop,
            rx,
        })
    }

    /// [`start`](Self::start) followed by [`RunningService::run`].
    pub async fn run(self) -> Result<()> {
        self.start()?.run().await;
        Ok(())
    }
}

/// A registered watch with its loop, ready to run.
pub struct RunningService {
    notifier: FsNotifier,
    event_loop: EventLoop,
    rx: mpsc::Receiver<WatchMessage>,
}

impl fmt::Debug for RunningService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningService")
            .field("notifier", &self.notifier)
            .field("event_loop", &self.event_loop)
            .finish_non_exhaustive()
    }
}

impl RunningService {
    pub fn notifier(&self) -> &FsNotifier {
        &self.notifier
    }

    /// Runs until the watch channel closes, then releases the watch.
    pub async fn run(self) {
        let RunningService {
            notifier,
            event_loop,
            rx,
        } = self;
        event_loop.run(rx).await;
        drop(notifier);
    }
}
