//! Startup sequencing for the `squeezerd` binary.

use std::sync::Arc;

use anyhow::Context;
use squeezer_config::{Config, ConfigLoad, ConfigLoader, ConfigWarnings};
use squeezer_core::{FfmpegTranscoder, SqueezeService};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod cli;

use cli::Cli;

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Resolves configuration for the given command line.
pub fn load_config(cli: &Cli) -> anyhow::Result<ConfigLoad> {
    ConfigLoader::with_options(cli.loader_options())
        .load()
        .context("failed to load configuration")
}

fn log_config(config: &Config, warnings: &ConfigWarnings) {
    if config.metadata.env_file_loaded {
        info!("loaded .env file");
    }
    if let Some(path) = &config.metadata.config_path {
        info!(path = %path.display(), "configuration loaded from file");
    }

    for warning in warnings.iter() {
        match &warning.hint {
            Some(hint) => {
                warn!(message = %warning.message, hint = %hint, "configuration warning")
            }
            None => {
                warn!(message = %warning.message, "configuration warning")
            }
        }
    }

    info!(
        incoming = %config.layout.incoming.display(),
        output = %config.layout.output.display(),
        archive = %config.layout.archive.display(),
        ffmpeg = %config.ffmpeg.ffmpeg_path.display(),
        codec = %config.ffmpeg.video_codec,
        quality = config.ffmpeg.quality,
        detection = ?config.detection,
        max_concurrent_jobs = ?config.max_concurrent_jobs,
        "effective configuration"
    );
}

/// Loads configuration, registers the watch and runs until the watch
/// channel closes. Setup failures are logged and returned.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let ConfigLoad { config, warnings } = match load_config(&cli) {
        Ok(load) => load,
        Err(err) => {
            error!("{err:#}");
            return Err(err);
        }
    };
    log_config(&config, &warnings);

    let transcoder = Arc::new(FfmpegTranscoder::new(config.ffmpeg_config()));
    let service = SqueezeService::new(config.service_settings(), transcoder);

    let running = match service.start() {
        Ok(running) => running,
        Err(err) => {
            error!("Failed to start watcher: {err}");
            return Err(err).context("failed to start watcher");
        }
    };

    running.run().await;
    info!("Watcher stopped");
    Ok(())
}
