use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::executor::ExecutorSettings;
use crate::link::LinkSettings;

const DEFAULT_STEP_SECONDS: i64 = 5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub station: Option<StationConfig>,
    pub link: LinkSettings,
    #[serde(default)]
    pub interpolation: InterpolationConfig,
    #[serde(default)]
    pub executor: ExecutorSettings,
    pub tle: Option<TleConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: Option<String>,
    /// `"<lat>, <lon>"` in degrees.
    pub coordinates: String,
    #[serde(default)]
    pub altitude_m: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InterpolationConfig {
    #[serde(default = "default_step_seconds")]
    pub step_seconds: i64,
    #[serde(default)]
    pub rounding_digits: u32,
}

impl Default for InterpolationConfig {
    fn default() -> Self {
        Self {
            step_seconds: DEFAULT_STEP_SECONDS,
            rounding_digits: 0,
        }
    }
}

fn default_step_seconds() -> i64 {
    DEFAULT_STEP_SECONDS
}

#[derive(Debug, Clone, Deserialize)]
pub struct TleConfig {
    pub folder: PathBuf,
    #[serde(default)]
    pub min_elevation: f64,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interpolation.step_seconds <= 0 {
            return Err(ConfigError::Invalid(format!(
                "interpolation.step_seconds must be positive, got {}",
                self.interpolation.step_seconds
            )));
        }
        if !(self.executor.time_scale.is_finite() && self.executor.time_scale > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "executor.time_scale must be positive, got {}",
                self.executor.time_scale
            )));
        }
        if self.link.baud_rate == 0 {
            return Err(ConfigError::Invalid("link.baud_rate must be positive".into()));
        }
        if self.link.port.trim().is_empty() {
            return Err(ConfigError::Invalid("link.port must not be empty".into()));
        }
        Ok(())
    }
}

/// Reads durations written the humantime way (`10s`, `2m`, `1h 30m`).
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    humantime::parse_duration(s.trim()).map_err(serde::de::Error::custom)
}
