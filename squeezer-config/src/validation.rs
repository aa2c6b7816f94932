use std::path::PathBuf;

use thiserror::Error;

use super::models::Config;
use squeezer_core::DetectionMode;

/// Highest constant rate factor accepted by x264/x265.
pub const MAX_QUALITY: i64 = 51;

#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("{first} and {second} directories must differ (both are {path})")]
    OverlappingDirectories {
        first: &'static str,
        second: &'static str,
        path: PathBuf,
    },
    #[error("quality must be between 0 and 51, got {value}")]
    QualityOutOfRange { value: i64 },
    #[error("video codec must not be empty")]
    EmptyVideoCodec,
    #[error("stability interval must be greater than zero")]
    ZeroStabilityInterval,
    #[error("max concurrent jobs must be greater than zero when set")]
    ZeroConcurrency,
}

#[derive(Debug, Clone)]
pub struct ConfigWarning {
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, Default, Clone)]
pub struct ConfigWarnings {
    pub items: Vec<ConfigWarning>,
}

impl ConfigWarnings {
    pub fn push_with_hint<S: Into<String>, H: Into<String>>(&mut self, message: S, hint: H) {
        self.items.push(ConfigWarning {
            message: message.into(),
            hint: Some(hint.into()),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn extend(&mut self, other: ConfigWarnings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConfigWarning> {
        self.items.iter()
    }
}

/// Range checks on the quality value before it is narrowed.
pub fn check_quality(value: i64) -> Result<u8, ConfigValidationError> {
    if (0..=MAX_QUALITY).contains(&value) {
        u8::try_from(value).map_err(|_| ConfigValidationError::QualityOutOfRange { value })
    } else {
        Err(ConfigValidationError::QualityOutOfRange { value })
    }
}

/// Rejects configurations the service cannot run with and collects the
/// merely questionable ones as warnings.
pub fn validate(config: &Config) -> Result<ConfigWarnings, ConfigValidationError> {
    let mut warnings = ConfigWarnings::default();

    let layout = &config.layout;
    let named = [
        ("incoming", &layout.incoming),
        ("output", &layout.output),
        ("archive", &layout.archive),
    ];
    for (i, &(first, a)) in named.iter().enumerate() {
        for &(second, b) in named.iter().skip(i + 1) {
            if a == b {
                return Err(ConfigValidationError::OverlappingDirectories {
                    first,
                    second,
                    path: a.clone(),
                });
            }
        }
    }

    if config.ffmpeg.video_codec.trim().is_empty() {
        return Err(ConfigValidationError::EmptyVideoCodec);
    }

    if config.stability.interval.is_zero() {
        return Err(ConfigValidationError::ZeroStabilityInterval);
    }

    if config.max_concurrent_jobs == Some(0) {
        return Err(ConfigValidationError::ZeroConcurrency);
    }

    if config.stability.max_samples < 2 {
        warnings.push_with_hint(
            format!(
                "stability.max_samples = {} cannot compare two sizes; using 2",
                config.stability.max_samples
            ),
            "Set stability.max_samples to 2 or more",
        );
    }

    if config.detection == DetectionMode::Detached && config.max_concurrent_jobs == Some(1) {
        warnings.push_with_hint(
            "Detached detection with a single job slot queues every stable file behind one transcode",
            "Raise jobs.max_concurrent or use inline detection",
        );
    }

    Ok(warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_bounds_are_inclusive() {
        assert_eq!(check_quality(0).unwrap(), 0);
        assert_eq!(check_quality(51).unwrap(), 51);
        assert!(matches!(
            check_quality(52),
            Err(ConfigValidationError::QualityOutOfRange { value: 52 })
        ));
        assert!(check_quality(-1).is_err());
    }

    #[test]
    fn defaults_pass_without_warnings() {
        let warnings = validate(&Config::default()).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn same_output_and_archive_is_rejected() {
        let mut config = Config::default();
        config.layout.archive = config.layout.output.clone();

        let err = validate(&config).unwrap_err();
        assert!(matches!(
            err,
            ConfigValidationError::OverlappingDirectories {
                first: "output",
                second: "archive",
                ..
            }
        ));
    }

    #[test]
    fn trailing_separator_does_not_hide_overlap() {
        let mut config = Config::default();
        config.layout.incoming = PathBuf::from("media/in");
        config.layout.output = PathBuf::from("media/in/");

        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let config = Config {
            max_concurrent_jobs: Some(0),
            ..Config::default()
        };
        assert!(matches!(
            validate(&config),
            Err(ConfigValidationError::ZeroConcurrency)
        ));
    }

    #[test]
    fn questionable_settings_only_warn() {
        let mut config = Config {
            detection: DetectionMode::Detached,
            max_concurrent_jobs: Some(1),
            ..Config::default()
        };
        config.stability.max_samples = 1;

        let warnings = validate(&config).unwrap();
        assert_eq!(warnings.len(), 2);
    }
}
