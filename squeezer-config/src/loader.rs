use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use thiserror::Error;
use tracing::debug;

use squeezer_core::{DetectionMode, DirectoryLayout, FfmpegConfig, RescanConfig, StabilityConfig};

use super::{
    models::{
        Config, ConfigMetadata, ConfigOverrides, optional_millis,
        sources::{EnvConfig, FileConfig},
    },
    validation::{self, ConfigValidationError, ConfigWarnings},
};

const DEFAULT_CONFIG_LOCATIONS: [&str; 2] = ["squeezer.toml", "config/squeezer.toml"];

#[derive(Debug, Default, Clone)]
pub struct ConfigLoaderOptions {
    pub config_path: Option<PathBuf>,
    pub env_file: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

/// Layers defaults, the TOML file, the environment and overrides, in that
/// order of increasing precedence.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    options: ConfigLoaderOptions,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConfigLoaderOptions) -> Self {
        Self { options }
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.options.env_file = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        self.options.overrides = overrides;
        self
    }

    /// Loads `.env` into the process environment, then resolves the
    /// configuration against it.
    pub fn load(&self) -> Result<ConfigLoad, ConfigLoadError> {
        let env_file_loaded = match &self.options.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
            None => dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                dotenvy::Error::Io(_) => Ok(false),
                _ => Err(err),
            })?,
        };

        let mut load = self.load_with_env(EnvConfig::gather()?)?;
        load.config.metadata.env_file_loaded = env_file_loaded;
        Ok(load)
    }

    /// Resolves the configuration against an already gathered environment
    /// layer without touching `.env` files.
    pub fn load_with_env(&self, env: EnvConfig) -> Result<ConfigLoad, ConfigLoadError> {
        let (file_config, config_path) = self.load_file_config(&env)?;
        let (config, warnings) = self.compose_config(file_config, env, config_path)?;
        Ok(ConfigLoad { config, warnings })
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let mut source = ConfigPathSource::default();

        if let Some(explicit) = &self.options.config_path {
            source.explicit = Some(explicit.clone());
        } else if let Some(from_env) = &env.config_path {
            source.env = Some(from_env.clone());
        } else {
            source.default = DEFAULT_CONFIG_LOCATIONS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists());
        }

        let Some((path, provenance)) = source.resolved_path() else {
            return Ok((None, None));
        };

        if !path.exists() {
            if provenance.is_explicit() {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        debug!("Reading configuration from {}", path.display());
        let file_config = read_file_config(&path)?;
        Ok((Some(file_config), Some(path)))
    }

    fn compose_config(
        &self,
        file_config: Option<FileConfig>,
        env: EnvConfig,
        config_path: Option<PathBuf>,
    ) -> Result<(Config, ConfigWarnings), ConfigLoadError> {
        let mut warnings = ConfigWarnings::default();

        if config_path.is_none() {
            warnings.push_with_hint(
                "No squeezer.toml detected; using defaults and environment variables",
                "Create squeezer.toml or pass --config to pin the directories",
            );
        }

        let FileConfig {
            directories: file_dirs,
            ffmpeg: file_ffmpeg,
            stability: file_stability,
            jobs: file_jobs,
            rescan: file_rescan,
        } = file_config.unwrap_or_default();

        let defaults = DirectoryLayout::default();
        let layout = DirectoryLayout::new(
            env.incoming_dir
                .or(file_dirs.incoming)
                .unwrap_or(defaults.incoming),
            env.output_dir.or(file_dirs.output).unwrap_or(defaults.output),
            env.archive_dir
                .or(file_dirs.archive)
                .unwrap_or(defaults.archive),
        );

        let ffmpeg_defaults = FfmpegConfig::default();
        let quality = match env.quality.or(file_ffmpeg.quality) {
            Some(raw) => validation::check_quality(raw)?,
            None => ffmpeg_defaults.quality,
        };
        let ffmpeg = FfmpegConfig {
            ffmpeg_path: env
                .ffmpeg_path
                .or(file_ffmpeg.ffmpeg_path)
                .unwrap_or(ffmpeg_defaults.ffmpeg_path),
            video_codec: env
                .video_codec
                .or(file_ffmpeg.video_codec)
                .unwrap_or(ffmpeg_defaults.video_codec),
            quality,
        };

        let stability_defaults = StabilityConfig::default();
        let stability = StabilityConfig {
            interval: env
                .stability_interval_ms
                .or(file_stability.interval_ms)
                .map(Duration::from_millis)
                .unwrap_or(stability_defaults.interval),
            max_samples: env
                .stability_max_samples
                .or(file_stability.max_samples)
                .unwrap_or(stability_defaults.max_samples),
        };

        let detection = if env
            .detached_detection
            .or(file_stability.detached)
            .unwrap_or(false)
        {
            DetectionMode::Detached
        } else {
            DetectionMode::Inline
        };

        let rescan = RescanConfig {
            on_startup: env
                .rescan_on_startup
                .or(file_rescan.on_startup)
                .unwrap_or(false),
            interval: optional_millis(env.rescan_interval_ms.or(file_rescan.interval_ms)),
        };

        let mut config = Config {
            layout,
            ffmpeg,
            stability,
            detection,
            max_concurrent_jobs: env.max_concurrent_jobs.or(file_jobs.max_concurrent),
            rescan,
            metadata: ConfigMetadata {
                config_path,
                env_file_loaded: false,
            },
        };
        config.apply_overrides(&self.options.overrides);

        warnings.extend(validation::validate(&config)?);

        Ok((config, warnings))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("configuration file missing: {path}")]
    MissingConfig { path: PathBuf },
    #[error("failed to read configuration {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value '{value}' for {name}; expected {expected}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error(transparent)]
    Validation(#[from] ConfigValidationError),
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default)]
struct ConfigPathSource {
    explicit: Option<PathBuf>,
    env: Option<PathBuf>,
    default: Option<PathBuf>,
}

impl ConfigPathSource {
    fn resolved_path(&self) -> Option<(PathBuf, ConfigPathProvenance)> {
        if let Some(path) = &self.explicit {
            return Some((path.clone(), ConfigPathProvenance::Explicit));
        }
        if let Some(path) = &self.env {
            return Some((path.clone(), ConfigPathProvenance::Env));
        }
        if let Some(path) = &self.default {
            return Some((path.clone(), ConfigPathProvenance::Default));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConfigPathProvenance {
    Explicit,
    Env,
    Default,
}

impl ConfigPathProvenance {
    fn is_explicit(self) -> bool {
        matches!(
            self,
            ConfigPathProvenance::Explicit | ConfigPathProvenance::Env
        )
    }
}

#[derive(Debug)]
pub struct ConfigLoad {
    pub config: Config,
    pub warnings: ConfigWarnings,
}
