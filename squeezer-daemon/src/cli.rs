use std::path::PathBuf;

use clap::Parser;
use squeezer_config::{ConfigLoaderOptions, ConfigOverrides};

/// CLI entry point
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "squeezerd", version)]
#[command(about = "Compress MP4 files as they land in a watch folder")]
pub struct Cli {
    /// Path to squeezer.toml
    #[arg(long, env = "SQUEEZER_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// .env file to load before reading the environment
    #[arg(long, env = "SQUEEZER_ENV_FILE")]
    pub env_file: Option<PathBuf>,

    /// Directory to watch for new files (overrides config)
    #[arg(long)]
    pub incoming: Option<PathBuf>,

    /// Directory for compressed output (overrides config)
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Directory originals are moved to (overrides config)
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// ffmpeg executable (overrides config)
    #[arg(long)]
    pub ffmpeg: Option<PathBuf>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            incoming: self.incoming.clone(),
            output: self.output.clone(),
            archive: self.archive.clone(),
            ffmpeg_path: self.ffmpeg.clone(),
        }
    }

    pub fn loader_options(&self) -> ConfigLoaderOptions {
        ConfigLoaderOptions {
            config_path: self.config.clone(),
            env_file: self.env_file.clone(),
            overrides: self.overrides(),
        }
    }
}
