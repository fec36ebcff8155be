//! Simulated hardware features.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use autotune_app::ports::{Feature, Hardware};
use autotune_domain::error::{AutomationError, HardwareError};
use autotune_domain::state::{
    AlwaysOnUsbState, BatteryState, FanFullSpeedState, FeatureState, OverdriveState,
    PowerModeState, RefreshRate,
};

use crate::error::VirtualError;

/// How a [`VirtualFeature`] answers calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeatureMode {
    #[default]
    Working,
    /// Reports itself unsupported; reads and writes still work.
    Unsupported,
    /// Behaves as if the hardware class did not exist on this machine.
    Absent,
    /// Every read and write fails.
    Failing,
}

/// In-memory feature holding a `T`.
pub struct VirtualFeature<T> {
    state: Mutex<T>,
    offered: Vec<T>,
    mode: Mutex<FeatureMode>,
}

impl<T: FeatureState> VirtualFeature<T> {
    /// A working feature in `state`. `offered` lists the states it can be
    /// set to; an empty list accepts anything.
    #[must_use]
    pub fn new(state: T, offered: Vec<T>) -> Self {
        Self {
            state: Mutex::new(state),
            offered,
            mode: Mutex::new(FeatureMode::Working),
        }
    }

    /// Current state, without going through the port.
    #[must_use]
    pub fn current(&self) -> T {
        lock(&self.state).clone()
    }

    /// Overwrite the state regardless of mode, as a change made outside
    /// the engine would.
    pub fn force(&self, state: T) {
        *lock(&self.state) = state;
    }

    pub fn set_mode(&self, mode: FeatureMode) {
        *lock(&self.mode) = mode;
    }

    fn check(&self) -> Result<(), AutomationError> {
        match *lock(&self.mode) {
            FeatureMode::Working | FeatureMode::Unsupported => Ok(()),
            FeatureMode::Absent => Err(HardwareError::CapabilityAbsent {
                class: format!("VIRTUAL_{}", T::FEATURE.as_str().to_uppercase()),
            }
            .into()),
            FeatureMode::Failing => Err(VirtualError::NotResponding {
                feature: T::FEATURE,
            }
            .into()),
        }
    }
}

impl<T: FeatureState> Feature<T> for VirtualFeature<T> {
    async fn is_supported(&self) -> Result<bool, AutomationError> {
        self.check()?;
        Ok(*lock(&self.mode) != FeatureMode::Unsupported)
    }

    async fn get_state(&self) -> Result<T, AutomationError> {
        self.check()?;
        Ok(self.current())
    }

    async fn set_state(&self, state: T) -> Result<(), AutomationError> {
        self.check()?;
        tracing::debug!(feature = %T::FEATURE, %state, "virtual feature set");
        *lock(&self.state) = state;
        Ok(())
    }

    async fn get_all_states(&self) -> Result<Vec<T>, AutomationError> {
        self.check()?;
        Ok(self.offered.clone())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Every feature of the simulated machine.
pub struct VirtualHardware {
    pub power_mode: Arc<VirtualFeature<PowerModeState>>,
    pub battery_mode: VirtualFeature<BatteryState>,
    pub fan_full_speed: VirtualFeature<FanFullSpeedState>,
    pub overdrive: VirtualFeature<OverdriveState>,
    pub always_on_usb: VirtualFeature<AlwaysOnUsbState>,
    pub refresh_rate: VirtualFeature<RefreshRate>,
}

impl Default for VirtualHardware {
    fn default() -> Self {
        Self {
            power_mode: Arc::new(VirtualFeature::new(
                PowerModeState::Balance,
                PowerModeState::ALL.to_vec(),
            )),
            battery_mode: VirtualFeature::new(BatteryState::Normal, BatteryState::ALL.to_vec()),
            fan_full_speed: VirtualFeature::new(
                FanFullSpeedState::Off,
                FanFullSpeedState::ALL.to_vec(),
            ),
            overdrive: VirtualFeature::new(OverdriveState::Off, OverdriveState::ALL.to_vec()),
            always_on_usb: VirtualFeature::new(
                AlwaysOnUsbState::Off,
                AlwaysOnUsbState::ALL.to_vec(),
            ),
            refresh_rate: VirtualFeature::new(
                RefreshRate(165),
                vec![RefreshRate(60), RefreshRate(165)],
            ),
        }
    }
}

impl Hardware for VirtualHardware {
    type PowerMode = VirtualFeature<PowerModeState>;
    type BatteryMode = VirtualFeature<BatteryState>;
    type FanFullSpeed = VirtualFeature<FanFullSpeedState>;
    type Overdrive = VirtualFeature<OverdriveState>;
    type AlwaysOnUsb = VirtualFeature<AlwaysOnUsbState>;
    type RefreshRate = VirtualFeature<RefreshRate>;

    fn power_mode(&self) -> &Self::PowerMode {
        &self.power_mode
    }

    fn battery_mode(&self) -> &Self::BatteryMode {
        &self.battery_mode
    }

    fn fan_full_speed(&self) -> &Self::FanFullSpeed {
        &self.fan_full_speed
    }

    fn overdrive(&self) -> &Self::Overdrive {
        &self.overdrive
    }

    fn always_on_usb(&self) -> &Self::AlwaysOnUsb {
        &self.always_on_usb
    }

    fn refresh_rate(&self) -> &Self::RefreshRate {
        &self.refresh_rate
    }
}
