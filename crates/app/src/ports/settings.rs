//! Settings store port — durable automation configuration.

use std::future::Future;
use std::sync::Arc;

use autotune_domain::error::AutomationError;
use autotune_domain::settings::AutomationSettings;

/// Loads and persists [`AutomationSettings`].
///
/// The processor keeps the authoritative copy in memory and calls
/// [`save`](Self::save) after every change.
pub trait SettingsStore: Send + Sync {
    /// Load the persisted settings, or defaults when nothing was saved yet.
    fn load(&self) -> impl Future<Output = Result<AutomationSettings, AutomationError>> + Send;

    /// Persist `settings`, replacing what was stored.
    fn save(
        &self,
        settings: &AutomationSettings,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send;
}

impl<T: SettingsStore> SettingsStore for Arc<T> {
    fn load(&self) -> impl Future<Output = Result<AutomationSettings, AutomationError>> + Send {
        (**self).load()
    }

    fn save(
        &self,
        settings: &AutomationSettings,
    ) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).save(settings)
    }
}
