//! System probe port — read the *current* state of the machine.
//!
//! Composite `And` triggers need to know whether their other conditions
//! hold right now (is the AC adapter plugged in, which network are we on),
//! not only whether the incoming event matches.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDateTime;

use autotune_domain::error::AutomationError;
use autotune_domain::event::{AcAdapterState, ProcessInfo};
use autotune_domain::id::PresetId;
use autotune_domain::state::PowerModeState;

/// Display-related flags read together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayStatus {
    pub display_on: bool,
    pub lid_open: bool,
    pub external_display_connected: bool,
    pub hdr_enabled: bool,
}

/// Reads current machine state on demand.
pub trait SystemProbe: Send + Sync {
    fn ac_adapter(&self) -> impl Future<Output = Result<AcAdapterState, AutomationError>> + Send;

    fn power_mode(&self) -> impl Future<Output = Result<PowerModeState, AutomationError>> + Send;

    /// The active custom preset, if the machine is in custom mode.
    fn active_preset(
        &self,
    ) -> impl Future<Output = Result<Option<PresetId>, AutomationError>> + Send;

    fn games_running(&self) -> impl Future<Output = Result<bool, AutomationError>> + Send;

    fn running_processes(
        &self,
    ) -> impl Future<Output = Result<Vec<ProcessInfo>, AutomationError>> + Send;

    fn session_locked(&self) -> impl Future<Output = Result<bool, AutomationError>> + Send;

    /// SSID of the connected network, `None` when disconnected.
    fn wifi_ssid(&self) -> impl Future<Output = Result<Option<String>, AutomationError>> + Send;

    fn display(&self) -> impl Future<Output = Result<DisplayStatus, AutomationError>> + Send;

    /// Current local wall-clock time.
    fn local_time(&self) -> impl Future<Output = Result<NaiveDateTime, AutomationError>> + Send;
}

impl<T: SystemProbe> SystemProbe for Arc<T> {
    fn ac_adapter(&self) -> impl Future<Output = Result<AcAdapterState, AutomationError>> + Send {
        (**self).ac_adapter()
    }

    fn power_mode(&self) -> impl Future<Output = Result<PowerModeState, AutomationError>> + Send {
        (**self).power_mode()
    }

    fn active_preset(
        &self,
    ) -> impl Future<Output = Result<Option<PresetId>, AutomationError>> + Send {
        (**self).active_preset()
    }

    fn games_running(&self) -> impl Future<Output = Result<bool, AutomationError>> + Send {
        (**self).games_running()
    }

    fn running_processes(
        &self,
    ) -> impl Future<Output = Result<Vec<ProcessInfo>, AutomationError>> + Send {
        (**self).running_processes()
    }

    fn session_locked(&self) -> impl Future<Output = Result<bool, AutomationError>> + Send {
        (**self).session_locked()
    }

    fn wifi_ssid(&self) -> impl Future<Output = Result<Option<String>, AutomationError>> + Send {
        (**self).wifi_ssid()
    }

    fn display(&self) -> impl Future<Output = Result<DisplayStatus, AutomationError>> + Send {
        (**self).display()
    }

    fn local_time(&self) -> impl Future<Output = Result<NaiveDateTime, AutomationError>> + Send {
        (**self).local_time()
    }
}
