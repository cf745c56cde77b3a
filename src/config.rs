//! Configuration loaded from `config.toml`.
//!
//! Every key is optional; a missing file means defaults.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Upper bound for the search windows, roughly ten years.
const MAX_SEARCH_BACK_DAYS: i64 = 3650;
/// The hue rotation is 60 degrees, so a wider band could trap a hue.
const MAX_AVOID_HUE_SPAN: f64 = 60.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where day files live; overridden by `--data-dir` and `WORKLOG_DATA_DIR`.
    pub data_dir: Option<PathBuf>,
    pub tracking: TrackingConfig,
    pub display: DisplayConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Days before today searched by `start` (0 = today only).
    pub search_back_days: i64,
    /// Days before today searched by `push`.
    pub push_search_back_days: i64,
    /// A closed session is reopened when a start follows its end within this many seconds.
    pub continuity_seconds: i64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            search_back_days: 0,
            push_search_back_days: 30,
            continuity_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub description_width: usize,
    /// Hues in `[avoid_hue_min, avoid_hue_max]` are hard to read on dark terminals.
    pub avoid_hue_min: f64,
    pub avoid_hue_max: f64,
    /// Minimum RGB distance between two descriptions' colors.
    pub min_color_distance: f64,
    pub color_attempts: usize,
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            description_width: 50,
            avoid_hue_min: 220.0,
            avoid_hue_max: 280.0,
            min_color_distance: 60.0,
            color_attempts: 8,
            color: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error; `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config: Config = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracking.search_back_days < 0 || self.tracking.push_search_back_days < 0 {
            return Err(ConfigError::Invalid(
                "tracking search windows cannot be negative".to_string(),
            ));
        }
        if self.tracking.search_back_days > MAX_SEARCH_BACK_DAYS
            || self.tracking.push_search_back_days > MAX_SEARCH_BACK_DAYS
        {
            return Err(ConfigError::Invalid(format!(
                "tracking search windows cannot exceed {MAX_SEARCH_BACK_DAYS} days"
            )));
        }
        if self.tracking.continuity_seconds < 0 {
            return Err(ConfigError::Invalid(
                "tracking.continuity_seconds cannot be negative".to_string(),
            ));
        }
        if self.display.description_width < 8 {
            return Err(ConfigError::Invalid(
                "display.description_width must be at least 8".to_string(),
            ));
        }
        let (min, max) = (self.display.avoid_hue_min, self.display.avoid_hue_max);
        if !(0.0..360.0).contains(&min) || !(0.0..360.0).contains(&max) || min > max {
            return Err(ConfigError::Invalid(
                "display.avoid_hue_min and avoid_hue_max must be ordered degrees in [0, 360)"
                    .to_string(),
            ));
        }
        if max - min > MAX_AVOID_HUE_SPAN {
            return Err(ConfigError::Invalid(format!(
                "display avoided hue band cannot be wider than {MAX_AVOID_HUE_SPAN} degrees"
            )));
        }
        if self.display.color_attempts == 0 {
            return Err(ConfigError::Invalid(
                "display.color_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{Config, ConfigError};

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config::load_from(&dir.path().join("config.toml")).expect("defaults");
        assert_eq!(config.tracking.push_search_back_days, 30);
        assert_eq!(config.tracking.continuity_seconds, 60);
        assert_eq!(config.display.description_width, 50);
        assert_eq!(config.logging.level, "info");
        assert!(config.data_dir.is_none());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "data_dir = \"/tmp/worklog\"\n[tracking]\nsearch_back_days = 7\n[display]\ncolor = false\n",
        )
        .expect("fixture write");

        let config = Config::load_from(&path).expect("config should parse");
        assert_eq!(config.data_dir.as_deref(), Some(std::path::Path::new("/tmp/worklog")));
        assert_eq!(config.tracking.search_back_days, 7);
        assert_eq!(config.tracking.push_search_back_days, 30);
        assert!(!config.display.color);
        assert_eq!(config.display.color_attempts, 8);
    }

    #[test]
    fn rejects_bad_values() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "[display]\ncolor_attempts = 0\n").expect("fixture write");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "[tracking]\npush_search_back_days = 100000000000000\n")
            .expect("fixture write");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "[display]\navoid_hue_min = 180.0\navoid_hue_max = 300.0\n")
            .expect("fixture write");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid(_))));

        fs::write(&path, "[tracking\n").expect("fixture write");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Parse { .. })));
    }
}
