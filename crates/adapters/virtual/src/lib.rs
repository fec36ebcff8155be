//! # autotune-adapter-virtual
//!
//! Virtual/demo machine that provides simulated hardware and event sources
//! for testing and demonstration purposes.
//!
//! ## Provided pieces
//!
//! | Piece | Port | Behaviour |
//! |-------|------|-----------|
//! | [`VirtualHardware`] | `Hardware` | Six in-memory features; each can be made unsupported, absent or failing |
//! | [`VirtualSource`] | `EventSource<T>` | Emits whatever the test or demo pushes; can be made unavailable |
//! | [`ClockSource`] | `EventSource<TimeEvent>` | Ticks at the start of every local minute, flagging sunrise and sunset when given a location |
//! | [`VirtualProbe`] | `SystemProbe` | Reads a mutable [`MachineSnapshot`] |
//!
//! [`VirtualMachine`] bundles them and keeps the probe in sync with the
//! events it simulates.
//!
//! ## Dependency rule
//!
//! Depends on `autotune-app` (port traits) and `autotune-domain` only.

mod error;
mod feature;
mod probe;
mod source;

use std::sync::Arc;
use std::time::Duration;

use autotune_app::listener::SourceListener;
use autotune_app::ports::{EventSource, Listener};
use autotune_app::processor::Listeners;
use autotune_domain::event::{
    AcAdapterState, GameEvent, HdrEvent, NativeMessage, NativeMessageEvent, PowerModeEvent,
    PowerStateEvent, PresetChangedEvent, ProcessEvent, ProcessEventKind, ProcessInfo,
    SessionEvent, TimeEvent, UserInactivityEvent, WifiEvent,
};
use autotune_domain::id::PresetId;
use autotune_domain::state::PowerModeState;

pub use error::VirtualError;
pub use feature::{FeatureMode, VirtualFeature, VirtualHardware};
pub use probe::{MachineSnapshot, VirtualProbe};
pub use source::{ClockSource, VirtualSource};

/// Polling granularity reported with inactivity events.
pub const INACTIVITY_RESOLUTION: Duration = Duration::from_secs(10);

/// One simulated source per event category.
pub struct VirtualSources {
    pub power_state: Arc<VirtualSource<PowerStateEvent>>,
    pub power_mode: Arc<VirtualSource<PowerModeEvent>>,
    pub hdr: Arc<VirtualSource<HdrEvent>>,
    pub native_message: Arc<VirtualSource<NativeMessageEvent>>,
    pub session: Arc<VirtualSource<SessionEvent>>,
    pub preset: Arc<VirtualSource<PresetChangedEvent>>,
    pub game: Arc<VirtualSource<GameEvent>>,
    pub process: Arc<VirtualSource<ProcessEvent>>,
    pub time: Arc<VirtualSource<TimeEvent>>,
    pub inactivity: Arc<VirtualSource<UserInactivityEvent>>,
    pub wifi: Arc<VirtualSource<WifiEvent>>,
}

impl Default for VirtualSources {
    fn default() -> Self {
        Self {
            power_state: Arc::new(VirtualSource::new("power_state")),
            power_mode: Arc::new(VirtualSource::new("power_mode")),
            hdr: Arc::new(VirtualSource::new("hdr")),
            native_message: Arc::new(VirtualSource::new("native_message")),
            session: Arc::new(VirtualSource::new("session")),
            preset: Arc::new(VirtualSource::new("preset")),
            game: Arc::new(VirtualSource::new("game")),
            process: Arc::new(VirtualSource::new("process")),
            time: Arc::new(VirtualSource::new("time")),
            inactivity: Arc::new(VirtualSource::new("inactivity")),
            wifi: Arc::new(VirtualSource::new("wifi")),
        }
    }
}

/// A simulated machine: hardware, probe and event sources kept consistent.
pub struct VirtualMachine {
    pub hardware: Arc<VirtualHardware>,
    pub probe: Arc<VirtualProbe>,
    pub sources: VirtualSources,
}

impl Default for VirtualMachine {
    fn default() -> Self {
        let hardware = Arc::new(VirtualHardware::default());
        let probe = Arc::new(VirtualProbe::new(Arc::clone(&hardware.power_mode)));
        Self {
            hardware,
            probe,
            sources: VirtualSources::default(),
        }
    }
}

impl VirtualMachine {
    /// Listeners over this machine's sources. With a `clock`, time events
    /// come from the real wall clock instead of [`VirtualSources::time`].
    #[must_use]
    pub fn listeners(&self, clock: Option<ClockSource>) -> Listeners {
        let s = &self.sources;
        Listeners {
            power_state: listen("power_state", &s.power_state),
            power_mode: listen("power_mode", &s.power_mode),
            hdr: listen("hdr", &s.hdr),
            native_message: listen("native_message", &s.native_message),
            session: listen("session", &s.session),
            preset: listen("preset", &s.preset),
            game: listen("game", &s.game),
            process: listen("process", &s.process),
            time: match clock {
                Some(clock) => listen("clock", &Arc::new(clock)),
                None => listen("time", &s.time),
            },
            inactivity: listen("inactivity", &s.inactivity),
            wifi: listen("wifi", &s.wifi),
        }
    }

    pub fn set_ac_adapter(&self, adapter: AcAdapterState) {
        self.probe.update(|s| s.ac_adapter = adapter);
        self.sources.power_state.emit(PowerStateEvent { adapter });
    }

    /// Simulate a power-mode change made outside the automation engine.
    pub fn set_power_mode(&self, state: PowerModeState) {
        self.hardware.power_mode.force(state);
        self.sources.power_mode.emit(PowerModeEvent { state });
    }

    pub fn activate_preset(&self, preset_id: PresetId) {
        self.hardware.power_mode.force(PowerModeState::Custom);
        self.probe.update(|s| s.active_preset = Some(preset_id));
        self.sources.preset.emit(PresetChangedEvent { preset_id });
    }

    pub fn set_games_running(&self, running: bool) {
        self.probe.update(|s| s.games_running = running);
        self.sources.game.emit(GameEvent { running });
    }

    pub fn start_process(&self, name: &str) {
        let process = ProcessInfo::named(name);
        self.probe.update(|s| s.processes.push(process.clone()));
        self.sources.process.emit(ProcessEvent {
            kind: ProcessEventKind::Started,
            process,
        });
    }

    pub fn stop_process(&self, name: &str) {
        self.probe
            .update(|s| s.processes.retain(|p| !p.name.eq_ignore_ascii_case(name)));
        self.sources.process.emit(ProcessEvent {
            kind: ProcessEventKind::Stopped,
            process: ProcessInfo::named(name),
        });
    }

    pub fn set_session_locked(&self, locked: bool) {
        self.probe.update(|s| s.session_locked = locked);
        self.sources.session.emit(SessionEvent { locked });
    }

    /// `Some(ssid)` connects, `None` disconnects.
    pub fn set_wifi(&self, ssid: Option<&str>) {
        let ssid = ssid.map(str::to_string);
        self.probe.update(|s| s.wifi_ssid.clone_from(&ssid));
        self.sources.wifi.emit(WifiEvent {
            connected: ssid.is_some(),
            ssid,
        });
    }

    pub fn set_hdr(&self, enabled: bool) {
        self.probe.update(|s| s.display.hdr_enabled = enabled);
        self.sources.hdr.emit(HdrEvent { enabled });
    }

    pub fn send_native_message(&self, message: NativeMessage) {
        self.probe.update(|s| match message {
            NativeMessage::LidOpened => s.display.lid_open = true,
            NativeMessage::LidClosed => s.display.lid_open = false,
            NativeMessage::DisplayOn => s.display.display_on = true,
            NativeMessage::DisplayOff => s.display.display_on = false,
            NativeMessage::ExternalDisplayConnected => s.display.external_display_connected = true,
            NativeMessage::ExternalDisplayDisconnected => {
                s.display.external_display_connected = false;
            }
        });
        self.sources
            .native_message
            .emit(NativeMessageEvent { message });
    }

    /// Report `inactive_for` of user idle time.
    pub fn set_inactive_for(&self, inactive_for: Duration) {
        self.sources.inactivity.emit(UserInactivityEvent {
            inactive_for,
            resolution: INACTIVITY_RESOLUTION,
        });
    }

    /// Emit a time tick on the simulated time source.
    pub fn tick(&self, event: TimeEvent) {
        self.sources.time.emit(event);
    }
}

fn listen<T, S>(name: &'static str, source: &Arc<S>) -> Arc<dyn Listener<T>>
where
    T: Clone + Send + 'static,
    S: EventSource<T>,
{
    Arc::new(SourceListener::<T, S>::new(name, Arc::clone(source)))
}
