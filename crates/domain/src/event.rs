//! Automation events — typed payloads describing something that happened.
//!
//! Listeners emit the payload structs defined here; the processor lifts
//! them into an [`AutomationEvent`] through the `From` impls before any
//! trigger looks at them.

use std::fmt;
use std::time::Duration;

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::id::PresetId;
use crate::state::PowerModeState;
use crate::sun::SunTimes;

/// A typed event evaluated against pipeline triggers.
#[derive(Debug, Clone, PartialEq)]
pub enum AutomationEvent {
    /// The engine started (synthetic, fired by `run_on_startup`).
    Startup,
    PowerState(PowerStateEvent),
    PowerMode(PowerModeEvent),
    Hdr(HdrEvent),
    NativeMessage(NativeMessageEvent),
    Game(GameEvent),
    Process(ProcessEvent),
    Session(SessionEvent),
    Time(TimeEvent),
    UserInactivity(UserInactivityEvent),
    Wifi(WifiEvent),
    PresetChanged(PresetChangedEvent),
}

impl fmt::Display for AutomationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => f.write_str("startup"),
            Self::PowerState(e) => write!(f, "power_state({})", e.adapter),
            Self::PowerMode(e) => write!(f, "power_mode({})", e.state),
            Self::Hdr(e) => write!(f, "hdr(enabled={})", e.enabled),
            Self::NativeMessage(e) => write!(f, "native_message({:?})", e.message),
            Self::Game(e) => write!(f, "game(running={})", e.running),
            Self::Process(e) => write!(f, "process({:?}, {})", e.kind, e.process.name),
            Self::Session(e) => write!(f, "session(locked={})", e.locked),
            Self::Time(e) => write!(f, "time({} {})", e.day, e.time.format("%H:%M")),
            Self::UserInactivity(e) => {
                write!(f, "user_inactivity({}s)", e.inactive_for.as_secs())
            }
            Self::Wifi(e) => match &e.ssid {
                Some(ssid) if e.connected => write!(f, "wifi(connected, {ssid})"),
                _ => write!(f, "wifi(connected={})", e.connected),
            },
            Self::PresetChanged(e) => write!(f, "preset_changed({})", e.preset_id),
        }
    }
}

/// AC adapter state as reported by the power listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcAdapterState {
    Connected,
    /// Connected, but the adapter cannot supply full power.
    ConnectedLowWattage,
    Disconnected,
}

impl fmt::Display for AcAdapterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connected => "connected",
            Self::ConnectedLowWattage => "connected_low_wattage",
            Self::Disconnected => "disconnected",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerStateEvent {
    pub adapter: AcAdapterState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerModeEvent {
    pub state: PowerModeState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HdrEvent {
    pub enabled: bool,
}

/// OS window messages the engine cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeMessage {
    LidOpened,
    LidClosed,
    DisplayOn,
    DisplayOff,
    ExternalDisplayConnected,
    ExternalDisplayDisconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NativeMessageEvent {
    pub message: NativeMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameEvent {
    pub running: bool,
}

/// Identity of an OS process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Executable name without extension, e.g. `"steam"`.
    pub name: String,
    /// Full executable path when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<String>,
}

impl ProcessInfo {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executable_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessEventKind {
    Started,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEvent {
    pub kind: ProcessEventKind,
    pub process: ProcessInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionEvent {
    pub locked: bool,
}

/// A wall-clock tick, emitted once per minute by the time listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeEvent {
    /// Local time truncated to the minute.
    pub time: NaiveTime,
    pub day: Weekday,
    pub is_sunrise: bool,
    pub is_sunset: bool,
}

impl TimeEvent {
    /// Build a tick from a local date-time, truncating seconds.
    #[must_use]
    pub fn at(local: NaiveDateTime) -> Self {
        let time = NaiveTime::from_hms_opt(local.hour(), local.minute(), 0).unwrap_or_default();
        Self {
            time,
            day: local.weekday(),
            is_sunrise: false,
            is_sunset: false,
        }
    }

    /// Flag the tick as sunrise or sunset when it falls on the same minute.
    #[must_use]
    pub fn with_sun_times(mut self, sun: Option<SunTimes>) -> Self {
        if let Some(sun) = sun {
            self.is_sunrise = same_minute(self.time, sun.sunrise);
            self.is_sunset = same_minute(self.time, sun.sunset);
        }
        self
    }

    /// Minutes elapsed since local midnight.
    #[must_use]
    pub fn minutes_since_midnight(&self) -> u32 {
        self.time.hour() * 60 + self.time.minute()
    }
}

fn same_minute(a: NaiveTime, b: NaiveTime) -> bool {
    a.hour() == b.hour() && a.minute() == b.minute()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserInactivityEvent {
    /// How long the user has been idle. Zero means activity resumed.
    pub inactive_for: Duration,
    /// Polling granularity of the inactivity listener.
    pub resolution: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiEvent {
    pub connected: bool,
    pub ssid: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetChangedEvent {
    pub preset_id: PresetId,
}

macro_rules! lift_event {
    ($($payload:ident => $variant:ident),+ $(,)?) => {
        $(
            impl From<$payload> for AutomationEvent {
                fn from(payload: $payload) -> Self {
                    Self::$variant(payload)
                }
            }
        )+
    };
}

lift_event!(
    PowerStateEvent => PowerState,
    PowerModeEvent => PowerMode,
    HdrEvent => Hdr,
    NativeMessageEvent => NativeMessage,
    GameEvent => Game,
    ProcessEvent => Process,
    SessionEvent => Session,
    TimeEvent => Time,
    UserInactivityEvent => UserInactivity,
    WifiEvent => Wifi,
    PresetChangedEvent => PresetChanged,
);
