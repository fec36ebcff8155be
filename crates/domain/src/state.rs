//! Feature states — the values a hardware feature can be read as and set to.
//!
//! Every state type implements [`FeatureState`], which ties it to exactly one
//! [`FeatureKind`]. Steps are generic over these types.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The hardware features automation steps can drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    PowerMode,
    BatteryMode,
    FanFullSpeed,
    Overdrive,
    AlwaysOnUsb,
    RefreshRate,
}

impl FeatureKind {
    /// Stable `snake_case` name, used in logs and notifications.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PowerMode => "power_mode",
            Self::BatteryMode => "battery_mode",
            Self::FanFullSpeed => "fan_full_speed",
            Self::Overdrive => "overdrive",
            Self::AlwaysOnUsb => "always_on_usb",
            Self::RefreshRate => "refresh_rate",
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value type describing the state of one hardware feature.
pub trait FeatureState:
    Clone + PartialEq + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// The feature this state belongs to.
    const FEATURE: FeatureKind;
}

macro_rules! define_state {
    ($(#[doc = $doc:expr])* $name:ident => $kind:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(Self::$variant => f.write_str($text)),+
                }
            }
        }

        impl FeatureState for $name {
            const FEATURE: FeatureKind = FeatureKind::$kind;
        }
    };
}

define_state!(
    /// Platform power profile.
    PowerModeState => PowerMode {
        Quiet => "quiet",
        Balance => "balance",
        Performance => "performance",
        Custom => "custom",
    }
);

define_state!(
    /// Battery charging strategy.
    BatteryState => BatteryMode {
        Conservation => "conservation",
        Normal => "normal",
        RapidCharge => "rapid_charge",
    }
);

define_state!(
    /// Whether the fans are pinned at full speed.
    FanFullSpeedState => FanFullSpeed {
        Off => "off",
        On => "on",
    }
);

define_state!(
    /// Panel overdrive.
    OverdriveState => Overdrive {
        Off => "off",
        On => "on",
    }
);

define_state!(
    /// USB power delivery while the machine sleeps or is off.
    AlwaysOnUsbState => AlwaysOnUsb {
        Off => "off",
        OnWhenSleeping => "on_when_sleeping",
        OnAlways => "on_always",
    }
);

/// Built-in display refresh rate in hertz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshRate(pub u32);

impl fmt::Display for RefreshRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Hz", self.0)
    }
}

impl FeatureState for RefreshRate {
    const FEATURE: FeatureKind = FeatureKind::RefreshRate;
}
