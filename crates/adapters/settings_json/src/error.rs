//! Settings-specific error type wrapping IO and JSON errors.

use std::path::PathBuf;

use autotune_domain::error::AutomationError;

/// Errors originating from the JSON settings file.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Reading, writing or renaming the file failed.
    #[error("settings file {path} could not be accessed")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file exists but is not valid settings JSON.
    #[error("settings file {path} is malformed")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl From<SettingsError> for AutomationError {
    fn from(err: SettingsError) -> Self {
        Self::Storage(Box::new(err))
    }
}
