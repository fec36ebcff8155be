//! Trigger evaluation against events and against current machine state.
//!
//! Leaf triggers are decided by the event payload alone. An `And` trigger
//! matches when at least one child matches the event and every other child
//! holds right now, which needs the [`SystemProbe`].

use chrono::{Datelike, Timelike};
use futures::FutureExt;
use futures::future::BoxFuture;

use autotune_domain::error::AutomationError;
use autotune_domain::event::{AcAdapterState, AutomationEvent};
use autotune_domain::pipeline::Trigger;

use crate::ports::SystemProbe;

/// Whether `trigger` should run its pipeline for `event`.
pub fn is_matching_event<'a, Q: SystemProbe>(
    trigger: &'a Trigger,
    event: &'a AutomationEvent,
    probe: &'a Q,
) -> BoxFuture<'a, bool> {
    async move {
        match trigger {
            Trigger::And { triggers } => {
                let mut any_matched = false;
                for child in triggers {
                    if is_matching_event(child, event, probe).await {
                        any_matched = true;
                    } else if !is_matching_state(child, probe).await {
                        return false;
                    }
                }
                any_matched
            }
            Trigger::Or { triggers } => {
                for child in triggers {
                    if is_matching_event(child, event, probe).await {
                        return true;
                    }
                }
                false
            }
            leaf => leaf.matches_event(event),
        }
    }
    .boxed()
}

/// Whether the condition `trigger` describes holds right now.
///
/// Startup, periodic and inactivity triggers describe moments, not states,
/// and never hold. Probe failures are logged and count as "does not hold".
pub fn is_matching_state<'a, Q: SystemProbe>(
    trigger: &'a Trigger,
    probe: &'a Q,
) -> BoxFuture<'a, bool> {
    async move {
        match trigger {
            Trigger::And { triggers } => {
                for child in triggers {
                    if !is_matching_state(child, probe).await {
                        return false;
                    }
                }
                true
            }
            Trigger::Or { triggers } => {
                for child in triggers {
                    if is_matching_state(child, probe).await {
                        return true;
                    }
                }
                false
            }
            leaf => leaf_state(leaf, probe).await.unwrap_or_else(|err| {
                tracing::warn!(%err, trigger = %leaf, "failed to read current state");
                false
            }),
        }
    }
    .boxed()
}

async fn leaf_state<Q: SystemProbe>(trigger: &Trigger, probe: &Q) -> Result<bool, AutomationError> {
    let holds = match trigger {
        Trigger::Startup | Trigger::Periodic { .. } | Trigger::UserInactivity { .. } => false,
        Trigger::AcAdapterConnected => probe.ac_adapter().await? == AcAdapterState::Connected,
        Trigger::LowWattageAcAdapterConnected => {
            probe.ac_adapter().await? == AcAdapterState::ConnectedLowWattage
        }
        Trigger::AcAdapterDisconnected => {
            probe.ac_adapter().await? == AcAdapterState::Disconnected
        }
        Trigger::PowerMode { state } => probe.power_mode().await? == *state,
        Trigger::PresetChanged { preset_id } => probe.active_preset().await? == Some(*preset_id),
        Trigger::GamesRunning => probe.games_running().await?,
        Trigger::GamesStopped => !probe.games_running().await?,
        Trigger::ProcessesStarted { names } => {
            let running = probe.running_processes().await?;
            names.iter().any(|name| {
                running
                    .iter()
                    .any(|process| process.name.eq_ignore_ascii_case(name))
            })
        }
        Trigger::ProcessesStopped { names } => {
            let running = probe.running_processes().await?;
            !names.is_empty()
                && names.iter().all(|name| {
                    !running
                        .iter()
                        .any(|process| process.name.eq_ignore_ascii_case(name))
                })
        }
        Trigger::SessionLocked => probe.session_locked().await?,
        Trigger::SessionUnlocked => !probe.session_locked().await?,
        Trigger::TimeOfDay { time, days, .. } => {
            let now = probe.local_time().await?;
            (days.is_empty() || days.contains(&now.weekday()))
                && time.is_some_and(|t| t.hour() == now.hour() && t.minute() == now.minute())
        }
        Trigger::WifiConnected { ssids } => match probe.wifi_ssid().await? {
            Some(ssid) => ssids.is_empty() || ssids.contains(&ssid),
            None => false,
        },
        Trigger::WifiDisconnected => probe.wifi_ssid().await?.is_none(),
        Trigger::Hdr { enabled } => probe.display().await?.hdr_enabled == *enabled,
        Trigger::Display { on } => probe.display().await?.display_on == *on,
        Trigger::Lid { open } => probe.display().await?.lid_open == *open,
        Trigger::ExternalDisplay { connected } => {
            probe.display().await?.external_display_connected == *connected
        }
        Trigger::And { .. } | Trigger::Or { .. } => {
            return Ok(is_matching_state(trigger, probe).await);
        }
    };
    Ok(holds)
}
