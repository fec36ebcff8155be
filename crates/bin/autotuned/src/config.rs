//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `autotune.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;

use serde::Deserialize;

use autotune_domain::sun::Coordinates;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Automation settings file.
    pub settings: SettingsConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Notification bus settings.
    pub bus: BusConfig,
    /// Wall-clock ticker.
    pub clock: ClockConfig,
    /// Where the machine is, for sunrise and sunset triggers.
    pub location: LocationConfig,
}

/// Where pipelines and the enabled flag are persisted.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// Path of the JSON settings file.
    pub path: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Notifications buffered per subscriber before it starts lagging.
    pub capacity: usize,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Feed time-of-day and periodic triggers from the real clock.
    pub enabled: bool,
}

/// Both or neither must be set. Without them sunrise and sunset never fire.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl LocationConfig {
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] when only one of the two is set
    /// or either is out of range.
    pub fn coordinates(&self) -> Result<Option<Coordinates>, ConfigError> {
        match (self.latitude, self.longitude) {
            (None, None) => Ok(None),
            (Some(latitude), Some(longitude)) => Coordinates::new(latitude, longitude)
                .map(Some)
                .map_err(|err| ConfigError::Validation(format!("location: {err}"))),
            _ => Err(ConfigError::Validation(
                "location needs both latitude and longitude".to_string(),
            )),
        }
    }
}

impl Config {
    /// Load configuration from `autotune.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("autotune.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("AUTOTUNE_SETTINGS") {
            self.settings.path = PathBuf::from(val);
        }
        if let Some(val) = var("AUTOTUNE_BUS_CAPACITY")
            && let Ok(capacity) = val.parse()
        {
            self.bus.capacity = capacity;
        }
        if let Some(val) = var("AUTOTUNE_LATITUDE")
            && let Ok(latitude) = val.parse()
        {
            self.location.latitude = Some(latitude);
        }
        if let Some(val) = var("AUTOTUNE_LONGITUDE")
            && let Ok(longitude) = val.parse()
        {
            self.location.longitude = Some(longitude);
        }
        if let Some(val) = var("AUTOTUNE_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.capacity == 0 {
            return Err(ConfigError::Validation(
                "bus capacity must be non-zero".to_string(),
            ));
        }
        if self.settings.path.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "settings path must not be empty".to_string(),
            ));
        }
        self.location.coordinates()?;
        Ok(())
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("autotune.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "autotuned=info,autotune=info".to_string(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { capacity: 256 }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
