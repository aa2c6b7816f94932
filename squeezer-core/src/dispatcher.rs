use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::pipeline::{FileTask, PipelineOutcome, ProcessingPipeline};

/// Completion notice for one pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskReport {
    pub source: PathBuf,
    pub outcome: PipelineOutcome,
}

/// Launches one independent pipeline run per stable file.
///
/// Runs are fire-and-forget: nothing joins them and their failures never
/// reach the caller. An optional permit pool bounds how many runs transcode
/// at once; waiting happens inside the spawned task, never in `dispatch`.
#[derive(Clone)]
pub struct TaskDispatcher {
    pipeline: Arc<ProcessingPipeline>,
    permits: Option<Arc<Semaphore>>,
    reports: Option<mpsc::UnboundedSender<TaskReport>>,
}

impl fmt::Debug for TaskDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskDispatcher")
            .field("pipeline", &self.pipeline)
            .field(
                "permits_available",
                &self.permits.as_ref().map(|p| p.available_permits()),
            )
            .field("reports", &self.reports.is_some())
            .finish()
    }
}

impl TaskDispatcher {
    pub fn new(pipeline: Arc<ProcessingPipeline>) -> Self {
        Self {
            pipeline,
            permits: None,
            reports: None,
        }
    }

    /// Bound the number of concurrently running pipelines. `None` leaves
    /// concurrency unbounded.
    pub fn with_max_concurrent(mut self, limit: Option<usize>) -> Self {
        self.permits = limit.map(|limit| Arc::new(Semaphore::new(limit.max(1))));
        self
    }

    /// Forward every run's outcome to `tx`.
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<TaskReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    pub fn pipeline(&self) -> &Arc<ProcessingPipeline> {
        &self.pipeline
    }

    pub fn dispatch(&self, task: FileTask) -> JoinHandle<()> {
        let pipeline = Arc::clone(&self.pipeline);
        let permits = self.permits.clone();
        let reports = self.reports.clone();

        debug!("dispatching {}", task.source_path.display());

        tokio::spawn(async move {
            let _permit = match permits {
                Some(permits) => match permits.acquire_owned().await {
                    Ok(permit) => Some(permit),
                    Err(err) => {
                        warn!("job permits unavailable: {}", err);
                        return;
                    }
                },
                None => None,
            };

            let source = task.source_path.clone();
            let outcome = pipeline.process(task).await;

            if let Some(reports) = reports {
                // Listener may have gone away; runs never depend on it
                let _ = reports.send(TaskReport { source, outcome });
            }
        })
    }
}
