//! TOML configuration for the calorie tracker.
//!
//! # Responsibility
//! - Load `calorie.toml`-style files into a typed `TrackerConfig`.
//! - Provide defaults for every field so an empty file is valid.
//!
//! # Invariants
//! - `diet.cut_below` and `diet.bulk_from` are finite and positive.
//! - `diet.cut_below <= diet.bulk_from`.

use crate::index::GroupingMode;
use crate::logging::default_log_level;
use crate::service::diet_policy::ThresholdDietPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_FILE_NAME: &str = "calorie_tracker.sqlite3";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub diet: DietConfig,
    pub index: IndexConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_FILE_NAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Absolute directory for rolling log files; logging stays off when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DietConfig {
    pub cut_below: f64,
    pub bulk_from: f64,
}

impl Default for DietConfig {
    fn default() -> Self {
        Self {
            cut_below: ThresholdDietPolicy::DEFAULT_CUT_BELOW,
            bulk_from: ThresholdDietPolicy::DEFAULT_BULK_FROM,
        }
    }
}

impl DietConfig {
    pub fn policy(&self) -> ThresholdDietPolicy {
        ThresholdDietPolicy {
            cut_below: self.cut_below,
            bulk_from: self.bulk_from,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexConfig {
    /// `timeline` (default, newest first) or `by_level`.
    pub grouping: GroupingMode,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl TrackerConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let DietConfig {
            cut_below,
            bulk_from,
        } = self.diet;
        for (name, value) in [("cut_below", cut_below), ("bulk_from", bulk_from)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "diet.{name} must be a positive number, got {value}"
                )));
            }
        }
        if cut_below > bulk_from {
            return Err(ConfigError::Invalid(format!(
                "diet.cut_below ({cut_below}) must not exceed diet.bulk_from ({bulk_from})"
            )));
        }
        if let Some(dir) = &self.logging.dir {
            if !dir.is_absolute() {
                return Err(ConfigError::Invalid(format!(
                    "logging.dir must be an absolute path, got `{}`",
                    dir.display()
                )));
            }
        }
        Ok(())
    }
}

/// Reads a config file; a missing file yields the defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<TrackerConfig, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(TrackerConfig::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    TrackerConfig::from_toml_str(&contents)
}
