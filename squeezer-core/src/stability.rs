//! Stable-write detection.
//!
//! There is no portable "writer closed the file" signal, so a file is judged
//! complete once its byte size stops changing between two consecutive
//! samples. Zero-length files converge like any other size; deciding whether
//! an empty file is worth processing is left to the caller.

use std::fmt;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

/// Source of file size samples.
#[async_trait]
pub trait SizeProbe: Send + Sync {
    async fn size(&self, path: &Path) -> io::Result<u64>;
}

/// Reads sizes from filesystem metadata without blocking the runtime.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsSizeProbe;

#[async_trait]
impl SizeProbe for FsSizeProbe {
    async fn size(&self, path: &Path) -> io::Result<u64> {
        tokio::fs::metadata(path).await.map(|meta| meta.len())
    }
}

/// Polling knobs for [`StabilityDetector`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StabilityConfig {
    /// Delay between two samples.
    pub interval: Duration,
    /// Upper bound on samples taken before giving up. Values below 2 are
    /// raised to 2.
    pub max_samples: u32,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_samples: 5,
        }
    }
}

/// Decides whether a file has finished being written.
#[derive(Clone)]
pub struct StabilityDetector {
    config: StabilityConfig,
    probe: Arc<dyn SizeProbe>,
}

impl fmt::Debug for StabilityDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StabilityDetector")
            .field("config", &self.config)
            .field("probe", &"SizeProbe")
            .finish()
    }
}

impl StabilityDetector {
    pub fn new(config: StabilityConfig) -> Self {
        Self::with_probe(config, Arc::new(FsSizeProbe))
    }

    pub fn with_probe(config: StabilityConfig, probe: Arc<dyn SizeProbe>) -> Self {
        Self { config, probe }
    }

    /// Returns true as soon as two consecutive samples agree. Returns false
    /// immediately if the path cannot be read, or once the sample budget is
    /// spent while the size keeps changing.
    pub async fn is_stable(&self, path: &Path) -> bool {
        let max_samples = self.config.max_samples.max(2);
        let mut previous: Option<u64> = None;

        for sample in 1..=max_samples {
            let size = match self.probe.size(path).await {
                Ok(size) => size,
                Err(err) => {
                    debug!(
                        "stability probe failed for {} at sample {}: {}",
                        path.display(),
                        sample,
                        err
                    );
                    return false;
                }
            };

            if previous == Some(size) {
                debug!(
                    "{} stable at {} bytes after {} samples",
                    path.display(),
                    size,
                    sample
                );
                return true;
            }
            previous = Some(size);

            if sample < max_samples {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        debug!(
            "{} still changing after {} samples",
            path.display(),
            max_samples
        );
        false
    }
}
