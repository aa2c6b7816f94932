//! The external compression step.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SqueezeError};

/// Number of trailing stderr lines carried into a transcode error.
const STDERR_TAIL_LINES: usize = 8;

/// Turns `source` into a compressed file at `target`.
///
/// Success means the implementation finished cleanly *and* left a readable
/// file at `target`.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, source: &Path, target: &Path) -> Result<()>;
}

/// Settings for [`FfmpegTranscoder`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FfmpegConfig {
    pub ffmpeg_path: PathBuf,
    pub video_codec: String,
    /// Constant rate factor; lower means better quality.
    pub quality: u8,
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            video_codec: "libx264".to_string(),
            quality: 28,
        }
    }
}

/// Runs `ffmpeg` once per file. No retries, no timeout.
#[derive(Clone, Debug, Default)]
pub struct FfmpegTranscoder {
    config: FfmpegConfig,
}

impl FfmpegTranscoder {
    pub fn new(config: FfmpegConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FfmpegConfig {
        &self.config
    }

    /// Build the ffmpeg invocation for one file.
    pub fn build_command(&self, source: &Path, target: &Path) -> Command {
        let mut cmd = Command::new(&self.config.ffmpeg_path);

        cmd.arg("-hide_banner");
        cmd.arg("-nostdin");
        cmd.arg("-y"); // The staging target may be a leftover from a crash

        cmd.arg("-i").arg(source);
        cmd.arg("-vcodec").arg(&self.config.video_codec);
        cmd.arg("-crf").arg(self.config.quality.to_string());

        // Targets are staged under a non-video name, so the muxer is explicit
        cmd.arg("-f").arg("mp4");
        cmd.arg(target);

        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, source: &Path, target: &Path) -> Result<()> {
        let mut cmd = self.build_command(source, target);
        debug!("running {:?}", cmd.as_std());

        let output = cmd.output().await.map_err(|err| {
            SqueezeError::Transcode(format!(
                "failed to launch {}: {}",
                self.config.ffmpeg_path.display(),
                err
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SqueezeError::Transcode(format!(
                "ffmpeg exited with {}: {}",
                output.status,
                stderr_tail(&stderr)
            )));
        }

        ensure_readable_output(target).await
    }
}

/// Confirms that `target` exists and is a regular file.
pub async fn ensure_readable_output(target: &Path) -> Result<()> {
    match tokio::fs::metadata(target).await {
        Ok(meta) if meta.is_file() => Ok(()),
        Ok(_) => Err(SqueezeError::Transcode(format!(
            "{} is not a regular file",
            target.display()
        ))),
        Err(err) => Err(SqueezeError::Transcode(format!(
            "transcoder reported success but {} is unreadable: {}",
            target.display(),
            err
        ))),
    }
}

fn stderr_tail(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join(" | ")
}
