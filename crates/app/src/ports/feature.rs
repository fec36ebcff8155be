//! Hardware feature port — read and drive one piece of machine state.

use std::future::Future;
use std::sync::Arc;

use autotune_domain::error::AutomationError;
use autotune_domain::state::{
    AlwaysOnUsbState, BatteryState, FanFullSpeedState, FeatureState, OverdriveState,
    PowerModeState, RefreshRate,
};

/// A hardware feature whose state is a `T`.
///
/// Implementations wrap vendor APIs. When the hardware class behind a
/// feature is missing entirely they must fail with
/// [`HardwareError::CapabilityAbsent`](autotune_domain::error::HardwareError::CapabilityAbsent)
/// so callers can treat it as "unsupported" rather than as a failure.
pub trait Feature<T: FeatureState>: Send + Sync {
    /// Whether this machine supports the feature at all.
    fn is_supported(&self) -> impl Future<Output = Result<bool, AutomationError>> + Send;

    /// Read the current state.
    fn get_state(&self) -> impl Future<Output = Result<T, AutomationError>> + Send;

    /// Apply a new state.
    fn set_state(&self, state: T) -> impl Future<Output = Result<(), AutomationError>> + Send;

    /// Every state this machine can be set to.
    fn get_all_states(&self) -> impl Future<Output = Result<Vec<T>, AutomationError>> + Send;
}

impl<T: FeatureState, F: Feature<T>> Feature<T> for Arc<F> {
    fn is_supported(&self) -> impl Future<Output = Result<bool, AutomationError>> + Send {
        (**self).is_supported()
    }

    fn get_state(&self) -> impl Future<Output = Result<T, AutomationError>> + Send {
        (**self).get_state()
    }

    fn set_state(&self, state: T) -> impl Future<Output = Result<(), AutomationError>> + Send {
        (**self).set_state(state)
    }

    fn get_all_states(&self) -> impl Future<Output = Result<Vec<T>, AutomationError>> + Send {
        (**self).get_all_states()
    }
}

/// The set of features steps can drive on this machine.
pub trait Hardware: Send + Sync {
    type PowerMode: Feature<PowerModeState>;
    type BatteryMode: Feature<BatteryState>;
    type FanFullSpeed: Feature<FanFullSpeedState>;
    type Overdrive: Feature<OverdriveState>;
    type AlwaysOnUsb: Feature<AlwaysOnUsbState>;
    type RefreshRate: Feature<RefreshRate>;

    fn power_mode(&self) -> &Self::PowerMode;
    fn battery_mode(&self) -> &Self::BatteryMode;
    fn fan_full_speed(&self) -> &Self::FanFullSpeed;
    fn overdrive(&self) -> &Self::Overdrive;
    fn always_on_usb(&self) -> &Self::AlwaysOnUsb;
    fn refresh_rate(&self) -> &Self::RefreshRate;
}

impl<T: Hardware> Hardware for Arc<T> {
    type PowerMode = T::PowerMode;
    type BatteryMode = T::BatteryMode;
    type FanFullSpeed = T::FanFullSpeed;
    type Overdrive = T::Overdrive;
    type AlwaysOnUsb = T::AlwaysOnUsb;
    type RefreshRate = T::RefreshRate;

    fn power_mode(&self) -> &Self::PowerMode {
        (**self).power_mode()
    }
    fn battery_mode(&self) -> &Self::BatteryMode {
        (**self).battery_mode()
    }
    fn fan_full_speed(&self) -> &Self::FanFullSpeed {
        (**self).fan_full_speed()
    }
    fn overdrive(&self) -> &Self::Overdrive {
        (**self).overdrive()
    }
    fn always_on_usb(&self) -> &Self::AlwaysOnUsb {
        (**self).always_on_usb()
    }
    fn refresh_rate(&self) -> &Self::RefreshRate {
        (**self).refresh_rate()
    }
}
