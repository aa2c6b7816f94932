use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::loader::ConfigLoadError;

pub const ENV_CONFIG_PATH: &str = "SQUEEZER_CONFIG_PATH";
pub const ENV_INCOMING_DIR: &str = "SQUEEZER_INCOMING_DIR";
pub const ENV_OUTPUT_DIR: &str = "SQUEEZER_OUTPUT_DIR";
pub const ENV_ARCHIVE_DIR: &str = "SQUEEZER_ARCHIVE_DIR";
pub const ENV_FFMPEG_PATH: &str = "SQUEEZER_FFMPEG_PATH";
pub const ENV_VIDEO_CODEC: &str = "SQUEEZER_VIDEO_CODEC";
pub const ENV_QUALITY: &str = "SQUEEZER_QUALITY";
pub const ENV_STABILITY_INTERVAL_MS: &str = "SQUEEZER_STABILITY_INTERVAL_MS";
pub const ENV_STABILITY_MAX_SAMPLES: &str = "SQUEEZER_STABILITY_MAX_SAMPLES";
pub const ENV_DETACHED_DETECTION: &str = "SQUEEZER_DETACHED_DETECTION";
pub const ENV_MAX_CONCURRENT_JOBS: &str = "SQUEEZER_MAX_CONCURRENT_JOBS";
pub const ENV_RESCAN_ON_STARTUP: &str = "SQUEEZER_RESCAN_ON_STARTUP";
pub const ENV_RESCAN_INTERVAL_MS: &str = "SQUEEZER_RESCAN_INTERVAL_MS";

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub directories: FileDirectoriesConfig,
    #[serde(default)]
    pub ffmpeg: FileFfmpegConfig,
    #[serde(default)]
    pub stability: FileStabilityConfig,
    #[serde(default)]
    pub jobs: FileJobsConfig,
    #[serde(default)]
    pub rescan: FileRescanConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileDirectoriesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incoming: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileFfmpegConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_codec: Option<String>,
    /// Kept wide so out-of-range values reach validation instead of failing
    /// the parse.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<i64>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileStabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_samples: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detached: Option<bool>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileJobsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_concurrent: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FileRescanConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_startup: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub incoming_dir: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
    pub ffmpeg_path: Option<PathBuf>,
    pub video_codec: Option<String>,
    pub quality: Option<i64>,
    pub stability_interval_ms: Option<u64>,
    pub stability_max_samples: Option<u32>,
    pub detached_detection: Option<bool>,
    pub max_concurrent_jobs: Option<usize>,
    pub rescan_on_startup: Option<bool>,
    pub rescan_interval_ms: Option<u64>,
}

impl EnvConfig {
    /// Reads the process environment.
    pub fn gather() -> Result<Self, ConfigLoadError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the environment layer from an arbitrary variable lookup.
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigLoadError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|raw| !raw.trim().is_empty());

        Ok(Self {
            config_path: var(ENV_CONFIG_PATH).map(PathBuf::from),
            incoming_dir: var(ENV_INCOMING_DIR).map(PathBuf::from),
            output_dir: var(ENV_OUTPUT_DIR).map(PathBuf::from),
            archive_dir: var(ENV_ARCHIVE_DIR).map(PathBuf::from),
            ffmpeg_path: var(ENV_FFMPEG_PATH).map(PathBuf::from),
            video_codec: var(ENV_VIDEO_CODEC).map(|raw| raw.trim().to_string()),
            quality: parse_number_var(ENV_QUALITY, var(ENV_QUALITY))?,
            stability_interval_ms: parse_number_var(
                ENV_STABILITY_INTERVAL_MS,
                var(ENV_STABILITY_INTERVAL_MS),
            )?,
            stability_max_samples: parse_number_var(
                ENV_STABILITY_MAX_SAMPLES,
                var(ENV_STABILITY_MAX_SAMPLES),
            )?,
            detached_detection: parse_bool_var(
                ENV_DETACHED_DETECTION,
                var(ENV_DETACHED_DETECTION),
            )?,
            max_concurrent_jobs: parse_number_var(
                ENV_MAX_CONCURRENT_JOBS,
                var(ENV_MAX_CONCURRENT_JOBS),
            )?,
            rescan_on_startup: parse_bool_var(
                ENV_RESCAN_ON_STARTUP,
                var(ENV_RESCAN_ON_STARTUP),
            )?,
            rescan_interval_ms: parse_number_var(
                ENV_RESCAN_INTERVAL_MS,
                var(ENV_RESCAN_INTERVAL_MS),
            )?,
        })
    }
}

fn parse_number_var<T: FromStr>(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<T>, ConfigLoadError> {
    raw.map(|raw| {
        raw.trim()
            .parse()
            .map_err(|_| ConfigLoadError::InvalidEnv {
                name,
                value: raw.clone(),
                expected: "an integer",
            })
    })
    .transpose()
}

fn parse_bool_var(
    name: &'static str,
    raw: Option<String>,
) -> Result<Option<bool>, ConfigLoadError> {
    raw.map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigLoadError::InvalidEnv {
            name,
            value: raw.clone(),
            expected: "a boolean (true/false, yes/no, on/off, 1/0)",
        }),
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn reads_every_variable() {
        let env = EnvConfig::from_lookup(env_of(&[
            (ENV_INCOMING_DIR, "/in"),
            (ENV_OUTPUT_DIR, "/out"),
            (ENV_ARCHIVE_DIR, "/done"),
            (ENV_FFMPEG_PATH, "/usr/bin/ffmpeg"),
            (ENV_VIDEO_CODEC, " libx265 "),
            (ENV_QUALITY, "23"),
            (ENV_STABILITY_INTERVAL_MS, "250"),
            (ENV_STABILITY_MAX_SAMPLES, "8"),
            (ENV_DETACHED_DETECTION, "yes"),
            (ENV_MAX_CONCURRENT_JOBS, "2"),
            (ENV_RESCAN_ON_STARTUP, "ON"),
            (ENV_RESCAN_INTERVAL_MS, "60000"),
        ]))
        .unwrap();

        assert_eq!(env.incoming_dir, Some(PathBuf::from("/in")));
        assert_eq!(env.output_dir, Some(PathBuf::from("/out")));
        assert_eq!(env.archive_dir, Some(PathBuf::from("/done")));
        assert_eq!(env.ffmpeg_path, Some(PathBuf::from("/usr/bin/ffmpeg")));
        assert_eq!(env.video_codec.as_deref(), Some("libx265"));
        assert_eq!(env.quality, Some(23));
        assert_eq!(env.stability_interval_ms, Some(250));
        assert_eq!(env.stability_max_samples, Some(8));
        assert_eq!(env.detached_detection, Some(true));
        assert_eq!(env.max_concurrent_jobs, Some(2));
        assert_eq!(env.rescan_on_startup, Some(true));
        assert_eq!(env.rescan_interval_ms, Some(60_000));
    }

    #[test]
    fn blank_values_are_unset() {
        let env = EnvConfig::from_lookup(env_of(&[
            (ENV_INCOMING_DIR, ""),
            (ENV_QUALITY, "   "),
        ]))
        .unwrap();

        assert!(env.incoming_dir.is_none());
        assert!(env.quality.is_none());
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = EnvConfig::from_lookup(env_of(&[(ENV_QUALITY, "high")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidEnv { name, .. } if name == ENV_QUALITY
        ));
    }

    #[test]
    fn malformed_booleans_are_rejected() {
        let err = EnvConfig::from_lookup(env_of(&[(ENV_RESCAN_ON_STARTUP, "maybe")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigLoadError::InvalidEnv { name, .. } if name == ENV_RESCAN_ON_STARTUP
        ));
    }

    #[test]
    fn file_config_parses_partial_tables() {
        let file: FileConfig = toml::from_str(
            r#"
            [directories]
            incoming = "/srv/videos"

            [ffmpeg]
            quality = 30
            "#,
        )
        .unwrap();

        assert_eq!(file.directories.incoming, Some(PathBuf::from("/srv/videos")));
        assert!(file.directories.output.is_none());
        assert_eq!(file.ffmpeg.quality, Some(30));
        assert!(file.stability.interval_ms.is_none());
    }
}
