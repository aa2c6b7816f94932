pub mod sources;

use std::path::PathBuf;
use std::time::Duration;

use squeezer_core::{
    DetectionMode, DirectoryLayout, FfmpegConfig, RescanConfig, ServiceSettings, StabilityConfig,
};

/// Fully resolved configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub layout: DirectoryLayout,
    pub ffmpeg: FfmpegConfig,
    pub stability: StabilityConfig,
    pub detection: DetectionMode,
    pub max_concurrent_jobs: Option<usize>,
    pub rescan: RescanConfig,
    pub metadata: ConfigMetadata,
}

impl Config {
    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            layout: self.layout.clone(),
            stability: self.stability,
            detection: self.detection,
            max_concurrent_jobs: self.max_concurrent_jobs,
            rescan: self.rescan,
            ..ServiceSettings::default()
        }
    }

    pub fn ffmpeg_config(&self) -> FfmpegConfig {
        self.ffmpeg.clone()
    }

    /// Applies command-line values on top of everything else.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(incoming) = &overrides.incoming {
            self.layout.incoming = incoming.clone();
        }
        if let Some(output) = &overrides.output {
            self.layout.output = output.clone();
        }
        if let Some(archive) = &overrides.archive {
            self.layout.archive = archive.clone();
        }
        if let Some(ffmpeg_path) = &overrides.ffmpeg_path {
            self.ffmpeg.ffmpeg_path = ffmpeg_path.clone();
        }
    }
}

/// Where the configuration came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigMetadata {
    pub config_path: Option<PathBuf>,
    pub env_file_loaded: bool,
}

/// Highest-precedence values, typically from the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub incoming: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub archive: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
}

/// Millisecond setting to a duration; zero disables.
pub(crate) fn optional_millis(ms: Option<u64>) -> Option<Duration> {
    ms.filter(|ms| *ms > 0).map(Duration::from_millis)
}
