//! Trigger — the event pattern that activates a pipeline.

use std::fmt;

use chrono::{NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::event::{
    AcAdapterState, AutomationEvent, NativeMessage, ProcessEvent, ProcessEventKind, TimeEvent,
};
use crate::id::PresetId;
use crate::state::PowerModeState;

use super::environment::AutomationEnvironment;

/// Describes which events should run a pipeline.
///
/// Leaf variants match exactly one event category. [`Trigger::And`] and
/// [`Trigger::Or`] compose other triggers; their event predicate here only
/// covers the "did any child match" half. The current-state half of `And`
/// needs a system probe and lives in the application layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires once when the engine starts.
    Startup,
    /// An AC adapter delivering full power was plugged in.
    AcAdapterConnected,
    /// An AC adapter that cannot deliver full power was plugged in.
    LowWattageAcAdapterConnected,
    AcAdapterDisconnected,
    /// The platform switched to the given power mode.
    PowerMode { state: PowerModeState },
    /// The given custom preset became active.
    PresetChanged { preset_id: PresetId },
    GamesRunning,
    GamesStopped,
    /// One of the named processes started (case-insensitive).
    ProcessesStarted { names: Vec<String> },
    /// One of the named processes exited (case-insensitive).
    ProcessesStopped { names: Vec<String> },
    SessionLocked,
    SessionUnlocked,
    /// A time of day, optionally restricted to some weekdays.
    TimeOfDay {
        #[serde(default)]
        time: Option<NaiveTime>,
        #[serde(default)]
        sunrise: bool,
        #[serde(default)]
        sunset: bool,
        /// Empty means every day.
        #[serde(default)]
        days: Vec<Weekday>,
    },
    /// Every `period_minutes`, aligned on local midnight.
    Periodic { period_minutes: u32 },
    /// The user has been idle for `threshold_secs`. Zero means "came back".
    UserInactivity { threshold_secs: u64 },
    /// Connected to one of `ssids` (empty means any network).
    WifiConnected {
        #[serde(default)]
        ssids: Vec<String>,
    },
    WifiDisconnected,
    Hdr { enabled: bool },
    Display { on: bool },
    Lid { open: bool },
    ExternalDisplay { connected: bool },
    /// Every child must hold; at least one must match the event.
    And { triggers: Vec<Trigger> },
    /// Any child matching the event is enough.
    Or { triggers: Vec<Trigger> },
}

impl Trigger {
    /// Check whether this trigger matches an event, looking only at the
    /// event payload.
    #[must_use]
    pub fn matches_event(&self, event: &AutomationEvent) -> bool {
        match (self, event) {
            (Self::Startup, AutomationEvent::Startup) => true,
            (Self::AcAdapterConnected, AutomationEvent::PowerState(e)) => {
                e.adapter == AcAdapterState::Connected
            }
            (Self::LowWattageAcAdapterConnected, AutomationEvent::PowerState(e)) => {
                e.adapter == AcAdapterState::ConnectedLowWattage
            }
            (Self::AcAdapterDisconnected, AutomationEvent::PowerState(e)) => {
                e.adapter == AcAdapterState::Disconnected
            }
            (Self::PowerMode { state }, AutomationEvent::PowerMode(e)) => e.state == *state,
            (Self::PresetChanged { preset_id }, AutomationEvent::PresetChanged(e)) => {
                e.preset_id == *preset_id
            }
            (Self::GamesRunning, AutomationEvent::Game(e)) => e.running,
            (Self::GamesStopped, AutomationEvent::Game(e)) => !e.running,
            (Self::ProcessesStarted { names }, AutomationEvent::Process(e)) => {
                process_matches(names, e, ProcessEventKind::Started)
            }
            (Self::ProcessesStopped { names }, AutomationEvent::Process(e)) => {
                process_matches(names, e, ProcessEventKind::Stopped)
            }
            (Self::SessionLocked, AutomationEvent::Session(e)) => e.locked,
            (Self::SessionUnlocked, AutomationEvent::Session(e)) => !e.locked,
            (
                Self::TimeOfDay {
                    time,
                    sunrise,
                    sunset,
                    days,
                },
                AutomationEvent::Time(e),
            ) => time_matches(*time, *sunrise, *sunset, days, e),
            (Self::Periodic { period_minutes }, AutomationEvent::Time(e)) => {
                *period_minutes > 0 && e.minutes_since_midnight() % period_minutes == 0
            }
            (Self::UserInactivity { threshold_secs }, AutomationEvent::UserInactivity(e)) => {
                let threshold = std::time::Duration::from_secs(*threshold_secs);
                if threshold.is_zero() {
                    e.inactive_for.is_zero()
                } else {
                    e.inactive_for >= threshold && e.inactive_for < threshold + e.resolution
                }
            }
            (Self::WifiConnected { ssids }, AutomationEvent::Wifi(e)) => {
                e.connected
                    && (ssids.is_empty()
                        || e.ssid.as_ref().is_some_and(|ssid| ssids.contains(ssid)))
            }
            (Self::WifiDisconnected, AutomationEvent::Wifi(e)) => !e.connected,
            (Self::Hdr { enabled }, AutomationEvent::Hdr(e)) => e.enabled == *enabled,
            (Self::Display { on }, AutomationEvent::NativeMessage(e)) => {
                e.message
                    == if *on {
                        NativeMessage::DisplayOn
                    } else {
                        NativeMessage::DisplayOff
                    }
            }
            (Self::Lid { open }, AutomationEvent::NativeMessage(e)) => {
                e.message
                    == if *open {
                        NativeMessage::LidOpened
                    } else {
                        NativeMessage::LidClosed
                    }
            }
            (Self::ExternalDisplay { connected }, AutomationEvent::NativeMessage(e)) => {
                e.message
                    == if *connected {
                        NativeMessage::ExternalDisplayConnected
                    } else {
                        NativeMessage::ExternalDisplayDisconnected
                    }
            }
            (Self::And { triggers } | Self::Or { triggers }, _) => {
                triggers.iter().any(|t| t.matches_event(event))
            }
            _ => false,
        }
    }

    /// All leaf triggers, depth-first. A leaf yields itself.
    #[must_use]
    pub fn flatten(&self) -> Vec<&Trigger> {
        match self {
            Self::And { triggers } | Self::Or { triggers } => {
                triggers.iter().flat_map(Trigger::flatten).collect()
            }
            leaf => vec![leaf],
        }
    }

    /// Check configuration invariants, recursing into composites.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyCompositeTrigger`] for an empty
    /// `And`/`Or`, [`ValidationError::ZeroPeriod`] for a periodic trigger
    /// without a period and [`ValidationError::NoTimeOfDay`] for a
    /// time-of-day trigger that could never fire.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::And { triggers } | Self::Or { triggers } => {
                if triggers.is_empty() {
                    return Err(ValidationError::EmptyCompositeTrigger);
                }
                triggers.iter().try_for_each(Trigger::validate)
            }
            Self::Periodic { period_minutes: 0 } => Err(ValidationError::ZeroPeriod),
            Self::TimeOfDay {
                time: None,
                sunrise: false,
                sunset: false,
                ..
            } => Err(ValidationError::NoTimeOfDay),
            _ => Ok(()),
        }
    }

    /// Export this trigger's configuration as environment variables for the
    /// steps of a run it started.
    pub fn update_environment(&self, env: &mut AutomationEnvironment) {
        match self {
            Self::Startup => env.set_flag("STARTUP", true),
            Self::AcAdapterConnected => env.set_flag("IS_AC_ADAPTER_CONNECTED", true),
            Self::LowWattageAcAdapterConnected => {
                env.set_flag("IS_AC_ADAPTER_CONNECTED", true);
                env.set_flag("IS_LOW_WATTAGE_AC_ADAPTER_CONNECTED", true);
            }
            Self::AcAdapterDisconnected => env.set_flag("IS_AC_ADAPTER_CONNECTED", false),
            Self::PowerMode { state } => env.set("POWER_MODE", state.to_string()),
            Self::PresetChanged { preset_id } => env.set("PRESET_ID", preset_id.to_string()),
            Self::GamesRunning => env.set_flag("GAME_RUNNING", true),
            Self::GamesStopped => env.set_flag("GAME_RUNNING", false),
            Self::ProcessesStarted { names } => {
                env.set_flag("PROCESSES_STARTED", true);
                env.set("PROCESSES", names.join(","));
            }
            Self::ProcessesStopped { names } => {
                env.set_flag("PROCESSES_STARTED", false);
                env.set("PROCESSES", names.join(","));
            }
            Self::SessionLocked => env.set_flag("SESSION_LOCKED", true),
            Self::SessionUnlocked => env.set_flag("SESSION_LOCKED", false),
            Self::TimeOfDay {
                time,
                sunrise,
                sunset,
                ..
            } => {
                if *sunrise {
                    env.set_flag("IS_SUNRISE", true);
                }
                if *sunset {
                    env.set_flag("IS_SUNSET", true);
                }
                if let Some(time) = time {
                    env.set("TIME", time.format("%H:%M").to_string());
                }
            }
            Self::Periodic { period_minutes } => {
                env.set("PERIOD_MINUTES", period_minutes.to_string());
            }
            Self::UserInactivity { threshold_secs } => {
                env.set("INACTIVITY_SECS", threshold_secs.to_string());
            }
            Self::WifiConnected { ssids } => {
                env.set_flag("WIFI_CONNECTED", true);
                if !ssids.is_empty() {
                    env.set("WIFI_SSIDS", ssids.join(","));
                }
            }
            Self::WifiDisconnected => env.set_flag("WIFI_CONNECTED", false),
            Self::Hdr { enabled } => env.set_flag("HDR_ENABLED", *enabled),
            Self::Display { on } => env.set_flag("DISPLAY_ON", *on),
            Self::Lid { open } => env.set_flag("LID_OPEN", *open),
            Self::ExternalDisplay { connected } => {
                env.set_flag("EXTERNAL_DISPLAY_CONNECTED", *connected);
            }
            Self::And { triggers } | Self::Or { triggers } => {
                for trigger in triggers {
                    trigger.update_environment(env);
                }
            }
        }
    }
}

fn process_matches(names: &[String], event: &ProcessEvent, kind: ProcessEventKind) -> bool {
    event.kind == kind
        && names
            .iter()
            .any(|name| name.eq_ignore_ascii_case(&event.process.name))
}

fn time_matches(
    time: Option<NaiveTime>,
    sunrise: bool,
    sunset: bool,
    days: &[Weekday],
    event: &TimeEvent,
) -> bool {
    if !days.is_empty() && !days.contains(&event.day) {
        return false;
    }
    if sunrise && event.is_sunrise {
        return true;
    }
    if sunset && event.is_sunset {
        return true;
    }
    time.is_some_and(|t| t.hour() == event.time.hour() && t.minute() == event.time.minute())
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => f.write_str("startup"),
            Self::AcAdapterConnected => f.write_str("ac_adapter_connected"),
            Self::LowWattageAcAdapterConnected => f.write_str("low_wattage_ac_adapter_connected"),
            Self::AcAdapterDisconnected => f.write_str("ac_adapter_disconnected"),
            Self::PowerMode { state } => write!(f, "power_mode({state})"),
            Self::PresetChanged { preset_id } => write!(f, "preset_changed({preset_id})"),
            Self::GamesRunning => f.write_str("games_running"),
            Self::GamesStopped => f.write_str("games_stopped"),
            Self::ProcessesStarted { names } => write!(f, "processes_started({})", names.join(",")),
            Self::ProcessesStopped { names } => write!(f, "processes_stopped({})", names.join(",")),
            Self::SessionLocked => f.write_str("session_locked"),
            Self::SessionUnlocked => f.write_str("session_unlocked"),
            Self::TimeOfDay { time, .. } => match time {
                Some(t) => write!(f, "time_of_day({})", t.format("%H:%M")),
                None => f.write_str("time_of_day"),
            },
            Self::Periodic { period_minutes } => write!(f, "periodic({period_minutes}m)"),
            Self::UserInactivity { threshold_secs } => {
                write!(f, "user_inactivity({threshold_secs}s)")
            }
            Self::WifiConnected { ssids } => write!(f, "wifi_connected({})", ssids.join(",")),
            Self::WifiDisconnected => f.write_str("wifi_disconnected"),
            Self::Hdr { enabled } => write!(f, "hdr({})", on_off(*enabled)),
            Self::Display { on } => write!(f, "display({})", on_off(*on)),
            Self::Lid { open } => f.write_str(if *open { "lid(open)" } else { "lid(closed)" }),
            Self::ExternalDisplay { connected } => write!(f, "external_display({connected})"),
            Self::And { triggers } => write!(f, "and({})", join(triggers)),
            Self::Or { triggers } => write!(f, "or({})", join(triggers)),
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn join(triggers: &[Trigger]) -> String {
    triggers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
