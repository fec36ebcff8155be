//! Simulated system probe.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;

use autotune_app::ports::{DisplayStatus, SystemProbe};
use autotune_domain::error::AutomationError;
use autotune_domain::event::{AcAdapterState, ProcessInfo};
use autotune_domain::id::PresetId;
use autotune_domain::state::PowerModeState;
use autotune_domain::time::local_now;

use crate::error::VirtualError;
use crate::feature::VirtualFeature;

/// What the simulated machine currently looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MachineSnapshot {
    pub ac_adapter: AcAdapterState,
    pub active_preset: Option<PresetId>,
    pub games_running: bool,
    pub processes: Vec<ProcessInfo>,
    pub session_locked: bool,
    pub wifi_ssid: Option<String>,
    pub display: DisplayStatus,
    /// Frozen local time; `None` follows the real clock.
    pub local_time: Option<NaiveDateTime>,
}

impl Default for MachineSnapshot {
    fn default() -> Self {
        Self {
            ac_adapter: AcAdapterState::Connected,
            active_preset: None,
            games_running: false,
            processes: Vec::new(),
            session_locked: false,
            wifi_ssid: None,
            display: DisplayStatus {
                display_on: true,
                lid_open: true,
                external_display_connected: false,
                hdr_enabled: false,
            },
            local_time: None,
        }
    }
}

/// [`SystemProbe`] over a [`MachineSnapshot`]. The power mode is read from
/// the virtual power-mode feature so steps and triggers agree.
pub struct VirtualProbe {
    snapshot: Mutex<MachineSnapshot>,
    power_mode: Arc<VirtualFeature<PowerModeState>>,
    offline: AtomicBool,
}

impl VirtualProbe {
    #[must_use]
    pub fn new(power_mode: Arc<VirtualFeature<PowerModeState>>) -> Self {
        Self {
            snapshot: Mutex::new(MachineSnapshot::default()),
            power_mode,
            offline: AtomicBool::new(false),
        }
    }

    /// Change the simulated state.
    pub fn update(&self, change: impl FnOnce(&mut MachineSnapshot)) {
        change(&mut *self.lock());
    }

    #[must_use]
    pub fn snapshot(&self) -> MachineSnapshot {
        self.lock().clone()
    }

    /// Make every read fail.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn lock(&self) -> MutexGuard<'_, MachineSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, field: impl FnOnce(&MachineSnapshot) -> R) -> Result<R, AutomationError> {
        if self.offline.load(Ordering::Acquire) {
            return Err(VirtualError::ProbeOffline.into());
        }
        Ok(field(&*self.lock()))
    }
}

impl SystemProbe for VirtualProbe {
    async fn ac_adapter(&self) -> Result<AcAdapterState, AutomationError> {
        self.read(|s| s.ac_adapter)
    }

    async fn power_mode(&self) -> Result<PowerModeState, AutomationError> {
        self.read(|_| self.power_mode.current())
    }

    async fn active_preset(&self) -> Result<Option<PresetId>, AutomationError> {
        self.read(|s| s.active_preset)
    }

    async fn games_running(&self) -> Result<bool, AutomationError> {
        self.read(|s| s.games_running)
    }

    async fn running_processes(&self) -> Result<Vec<ProcessInfo>, AutomationError> {
        self.read(|s| s.processes.clone())
    }

    async fn session_locked(&self) -> Result<bool, AutomationError> {
        self.read(|s| s.session_locked)
    }

    async fn wifi_ssid(&self) -> Result<Option<String>, AutomationError> {
        self.read(|s| s.wifi_ssid.clone())
    }

    async fn display(&self) -> Result<DisplayStatus, AutomationError> {
        self.read(|s| s.display)
    }

    async fn local_time(&self) -> Result<NaiveDateTime, AutomationError> {
        self.read(|s| s.local_time.unwrap_or_else(local_now))
    }
}
