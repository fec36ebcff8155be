//! # autotune-adapter-settings-json
//!
//! Settings persistence backed by a single JSON file.
//!
//! ## Responsibilities
//! - Implement the `SettingsStore` port defined in `autotune-app::ports::settings`
//! - Treat a missing file as "nothing saved yet" (default settings)
//! - Replace the file atomically: write a sibling temp file, then rename
//!
//! ## Dependency rule
//! Depends on `autotune-app` (for port traits) and `autotune-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod error;

use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use autotune_app::ports::SettingsStore;
use autotune_domain::error::AutomationError;
use autotune_domain::settings::AutomationSettings;

pub use error::SettingsError;

/// [`SettingsStore`] reading and writing one JSON file.
pub struct JsonSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonSettingsStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the settings file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SettingsError {
        SettingsError::Io {
            path: self.path.clone(),
            source,
        }
    }

    async fn read(&self) -> Result<AutomationSettings, SettingsError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no settings file, using defaults");
                return Ok(AutomationSettings::default());
            }
            Err(err) => return Err(self.io_error(err)),
        };
        serde_json::from_slice(&bytes).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })
    }

    async fn write(&self, settings: &AutomationSettings) -> Result<(), SettingsError> {
        let json = serde_json::to_vec_pretty(settings).map_err(|source| SettingsError::Json {
            path: self.path.clone(),
            source,
        })?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| self.io_error(err))?;
        }

        let _guard = self.write_lock.lock().await;
        let temp = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp, json)
            .await
            .map_err(|err| self.io_error(err))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|err| self.io_error(err))?;

        tracing::debug!(path = %self.path.display(), pipelines = settings.pipelines.len(), "settings saved");
        Ok(())
    }
}

impl SettingsStore for JsonSettingsStore {
    async fn load(&self) -> Result<AutomationSettings, AutomationError> {
        Ok(self.read().await?)
    }

    async fn save(&self, settings: &AutomationSettings) -> Result<(), AutomationError> {
        Ok(self.write(settings).await?)
    }
}
