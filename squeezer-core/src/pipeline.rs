//! Per-file processing: skip-if-done, transcode, relocate.
//!
//! Every step is attempted at most once. Failures end the run for that file
//! and are only ever reported through logs (and the returned
//! [`PipelineOutcome`], which the dispatcher forwards to optional listeners).

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::claims::{ClaimRegistry, FailureLedger};
use crate::error::{Result, SqueezeError};
use crate::layout::DirectoryLayout;
use crate::transcoder::Transcoder;

/// A stable, relevant file handed to exactly one pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileTask {
    pub source_path: PathBuf,
}

impl FileTask {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }
}

/// Terminal state of one pipeline run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// An output with the same base name already exists.
    AlreadyCompressed { output: PathBuf },
    /// Another run for the same base name is still active.
    InFlight,
    /// Output written and source archived.
    Compressed { output: PathBuf, archived: PathBuf },
    /// Transcoder failed; the source was left in place.
    TranscodeFailed { error: String },
    /// Output written but the source could not be archived.
    ArchiveFailed { output: PathBuf, error: String },
    /// The source path has no file name.
    InvalidSource,
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Compressed { .. })
    }
}

/// Runs the per-file sequence against a [`DirectoryLayout`].
#[derive(Clone)]
pub struct ProcessingPipeline {
    layout: DirectoryLayout,
    transcoder: Arc<dyn Transcoder>,
    claims: ClaimRegistry,
    failures: FailureLedger,
}

impl fmt::Debug for ProcessingPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingPipeline")
            .field("layout", &self.layout)
            .field("transcoder", &"Transcoder")
            .field("claims", &self.claims)
            .field("failures", &self.failures)
            .finish()
    }
}

impl ProcessingPipeline {
    pub fn new(layout: DirectoryLayout, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            layout,
            transcoder,
            claims: ClaimRegistry::new(),
            failures: FailureLedger::new(),
        }
    }

    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    pub fn claims(&self) -> &ClaimRegistry {
        &self.claims
    }

    /// Names whose most recent run failed to transcode.
    pub fn failures(&self) -> &FailureLedger {
        &self.failures
    }

    pub async fn process(&self, task: FileTask) -> PipelineOutcome {
        let source = task.source_path;
        let (Some(name), Some(output), Some(staging), Some(archive)) = (
            source.file_name(),
            self.layout.output_path_for(&source),
            self.layout.staging_path_for(&source),
            self.layout.archive_path_for(&source),
        ) else {
            warn!("Ignoring {} (no file name)", source.display());
            return PipelineOutcome::InvalidSource;
        };
        let display_name = name.to_string_lossy().into_owned();

        if path_exists(&output).await {
            info!("Skipping {} (already compressed)", display_name);
            return PipelineOutcome::AlreadyCompressed { output };
        }

        let Some(_claim) = self.claims.try_claim(name) else {
            info!("Skipping {} (already being compressed)", display_name);
            return PipelineOutcome::InFlight;
        };

        // A run that finished between the first check and the claim
        if path_exists(&output).await {
            info!("Skipping {} (already compressed)", display_name);
            return PipelineOutcome::AlreadyCompressed { output };
        }

        if let Err(err) = self.compress(&source, &staging, &output).await {
            error!("Error compressing {}: {}", source.display(), err);
            discard_staging(&staging).await;
            self.failures.record(name);
            return PipelineOutcome::TranscodeFailed {
                error: err.to_string(),
            };
        }
        info!("Compressed: {} -> {}", source.display(), output.display());
        self.failures.forget(name);

        match relocate(&source, &archive).await {
            Ok(()) => {
                info!(
                    "Moved {} to {}",
                    display_name,
                    self.layout.archive.display()
                );
                PipelineOutcome::Compressed {
                    output,
                    archived: archive,
                }
            }
            Err(err) => {
                error!(
                    "Error moving {} to {}: {}",
                    display_name,
                    self.layout.archive.display(),
                    err
                );
                PipelineOutcome::ArchiveFailed {
                    output,
                    error: err.to_string(),
                }
            }
        }
    }

    /// Transcode into the staging path, then publish it under the output
    /// name so a visible output is always complete.
    async fn compress(&self, source: &Path, staging: &Path, output: &Path) -> Result<()> {
        self.transcoder.transcode(source, staging).await?;

        tokio::fs::rename(staging, output).await.map_err(|err| {
            SqueezeError::Transcode(format!(
                "failed to publish {} as {}: {}",
                staging.display(),
                output.display(),
                err
            ))
        })
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

async fn discard_staging(staging: &Path) {
    match tokio::fs::remove_file(staging).await {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            "failed to remove partial output {}: {}",
            staging.display(),
            err
        ),
    }
}

/// Move `source` to `archive`, refusing to overwrite an existing entry.
async fn relocate(source: &Path, archive: &Path) -> Result<()> {
    if path_exists(archive).await {
        return Err(SqueezeError::Relocate(format!(
            "{} already exists",
            archive.display()
        )));
    }

    tokio::fs::rename(source, archive)
        .await
        .map_err(|err| SqueezeError::Relocate(err.to_string()))
}
