//! Automation processor — turns listener events into pipeline runs.
//!
//! Every listener callback is bridged into [`AutomationProcessor::process_event`]
//! on a spawned task. An event first goes through a cheap gate (does any
//! trigger match it at all?) and only then competes for the run lock.
//!
//! Runs are debounced by cancellation: a new qualifying event cancels the
//! token of the run before it, *then* waits for the run lock. The older run
//! notices at its next pipeline boundary (or inside a delay step) and
//! returns, so a burst of events ends with one complete run for the newest.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use autotune_domain::error::AutomationError;
use autotune_domain::event::{
    AutomationEvent, GameEvent, HdrEvent, NativeMessageEvent, PowerModeEvent, PowerStateEvent,
    PresetChangedEvent, ProcessEvent, SessionEvent, TimeEvent, UserInactivityEvent, WifiEvent,
};
use autotune_domain::id::PipelineId;
use autotune_domain::notification::{Notification, NotificationKind};
use autotune_domain::pipeline::Pipeline;
use autotune_domain::settings::AutomationSettings;

use crate::activation::{ListenerKind, required_listeners};
use crate::matching;
use crate::ports::{
    ChangedHandler, Hardware, Listener, NotificationPublisher, SettingsStore, SystemProbe,
};
use crate::runner::PipelineRunner;

/// Every listener the processor can drive.
///
/// The first group is started by [`AutomationProcessor::initialize`] and
/// stays wired; the second group is switched on and off according to the
/// triggers of the current pipelines.
pub struct Listeners {
    pub power_state: Arc<dyn Listener<PowerStateEvent>>,
    pub power_mode: Arc<dyn Listener<PowerModeEvent>>,
    pub hdr: Arc<dyn Listener<HdrEvent>>,
    pub native_message: Arc<dyn Listener<NativeMessageEvent>>,
    pub session: Arc<dyn Listener<SessionEvent>>,
    pub preset: Arc<dyn Listener<PresetChangedEvent>>,

    pub game: Arc<dyn Listener<GameEvent>>,
    pub process: Arc<dyn Listener<ProcessEvent>>,
    pub time: Arc<dyn Listener<TimeEvent>>,
    pub inactivity: Arc<dyn Listener<UserInactivityEvent>>,
    pub wifi: Arc<dyn Listener<WifiEvent>>,
}

impl Listeners {
    fn stop_optional(&self, kind: ListenerKind) {
        match kind {
            ListenerKind::Game => self.game.stop(),
            ListenerKind::Process => self.process.stop(),
            ListenerKind::Time => self.time.stop(),
            ListenerKind::Inactivity => self.inactivity.stop(),
            ListenerKind::Wifi => self.wifi.stop(),
        }
    }

    fn stop_core(&self) {
        self.power_state.stop();
        self.power_mode.stop();
        self.hdr.stop();
        self.native_message.stop();
        self.session.stop();
        self.preset.stop();
    }
}

struct ConfigState {
    is_enabled: bool,
    pipelines: Arc<Vec<Pipeline>>,
    active: BTreeSet<ListenerKind>,
    core_started: bool,
}

/// Reactive automation processor.
///
/// Built behind an [`Arc`] because listener callbacks hold a weak handle
/// back to it.
pub struct AutomationProcessor<S, H, P, Q> {
    settings: S,
    hardware: H,
    publisher: P,
    probe: Q,
    listeners: Listeners,
    config: tokio::sync::Mutex<ConfigState>,
    run_lock: tokio::sync::Mutex<()>,
    /// Serializes settings writes so they land in the order the
    /// configuration changed. Never taken while `config` is held.
    persist_lock: tokio::sync::Mutex<()>,
    current_run: Mutex<Option<CancellationToken>>,
    this: Weak<Self>,
}

impl<S, H, P, Q> AutomationProcessor<S, H, P, Q>
where
    S: SettingsStore + 'static,
    H: Hardware + 'static,
    P: NotificationPublisher + 'static,
    Q: SystemProbe + 'static,
{
    /// Create a processor. Nothing is loaded and no listener is started
    /// until [`initialize`](Self::initialize) is called.
    pub fn new(settings: S, hardware: H, publisher: P, probe: Q, listeners: Listeners) -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            settings,
            hardware,
            publisher,
            probe,
            listeners,
            config: tokio::sync::Mutex::new(ConfigState {
                is_enabled: false,
                pipelines: Arc::new(Vec::new()),
                active: BTreeSet::new(),
                core_started: false,
            }),
            run_lock: tokio::sync::Mutex::new(()),
            persist_lock: tokio::sync::Mutex::new(()),
            current_run: Mutex::new(None),
            this: this.clone(),
        })
    }

    /// Load the settings, wire the core listeners and start the optional
    /// listeners the loaded triggers need.
    ///
    /// Calling it again reloads the settings; core listeners are only
    /// started once.
    ///
    /// # Errors
    ///
    /// Returns the settings store error if loading fails. Nothing is
    /// started in that case.
    pub async fn initialize(&self) -> Result<(), AutomationError> {
        let settings = self.settings.load().await?;

        let mut config = self.config.lock().await;
        config.is_enabled = settings.is_enabled;
        config.pipelines = Arc::new(settings.pipelines);

        if !config.core_started {
            self.start_core_listeners();
            config.core_started = true;
        }
        self.update_listeners(&mut config);

        tracing::info!(
            enabled = config.is_enabled,
            pipelines = config.pipelines.len(),
            "automation initialized"
        );
        Ok(())
    }

    /// Whether automatic runs are currently allowed.
    pub async fn is_enabled(&self) -> bool {
        self.config.lock().await.is_enabled
    }

    /// Turn automation on or off and persist the flag.
    ///
    /// Disabling stops every optional listener. Core listeners stay wired;
    /// their events are dropped by the run while disabled.
    ///
    /// # Errors
    ///
    /// Returns the settings store error if saving fails. The in-memory flag
    /// and the listeners are updated regardless.
    #[tracing::instrument(skip(self))]
    pub async fn set_enabled(&self, enabled: bool) -> Result<(), AutomationError> {
        let _persist = self.persist_lock.lock().await;
        let settings = {
            let mut config = self.config.lock().await;
            config.is_enabled = enabled;
            self.update_listeners(&mut config);
            AutomationSettings {
                is_enabled: enabled,
                pipelines: config.pipelines.to_vec(),
            }
        };
        tracing::info!(enabled, "automation toggled");

        self.settings.save(&settings).await
    }

    /// Replace the pipeline list with a copy of `pipelines`.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Validation`] (leaving everything as it was)
    /// if any pipeline is invalid, or the settings store error if saving
    /// fails. In the latter case the new list is already live.
    #[tracing::instrument(skip(self, pipelines), fields(count = pipelines.len()))]
    pub async fn reload_pipelines(&self, pipelines: &[Pipeline]) -> Result<(), AutomationError> {
        for pipeline in pipelines {
            pipeline.validate()?;
        }

        let _persist = self.persist_lock.lock().await;
        let settings = {
            let mut config = self.config.lock().await;
            config.pipelines = Arc::new(pipelines.to_vec());
            self.update_listeners(&mut config);
            AutomationSettings {
                is_enabled: config.is_enabled,
                pipelines: config.pipelines.to_vec(),
            }
        };
        tracing::info!("pipelines reloaded");

        let saved = self.settings.save(&settings).await;

        let notification = Notification::new(NotificationKind::PipelinesChanged {
            pipelines: settings.pipelines,
        });
        self.publisher.publish(notification);
        saved
    }

    /// A copy of the current pipeline list.
    pub async fn get_pipelines(&self) -> Vec<Pipeline> {
        self.config.lock().await.pipelines.to_vec()
    }

    /// Optional listeners currently switched on.
    pub async fn active_listeners(&self) -> BTreeSet<ListenerKind> {
        self.config.lock().await.active.clone()
    }

    /// Fire a startup event in the background, if automation is enabled.
    ///
    /// Returns the handle of the spawned task, or `None` when disabled.
    pub async fn run_on_startup(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.is_enabled().await {
            tracing::debug!("automation disabled, skipping startup run");
            return None;
        }
        let processor = Arc::clone(self);
        Some(tokio::spawn(async move {
            processor.process_event(AutomationEvent::Startup).await;
        }))
    }

    /// Run `pipeline` now, regardless of its trigger.
    ///
    /// The run waits for any automatic run to finish but does not cancel
    /// it. The other pipelines of the current list (all but the one whose
    /// id matches) are handed to the steps as context.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's error.
    #[tracing::instrument(skip(self, pipeline), fields(pipeline = %pipeline.id, name = %pipeline.name))]
    pub async fn run_now(&self, pipeline: &Pipeline) -> Result<(), AutomationError> {
        let pipeline = pipeline.clone();
        let others = self.others(&pipeline.id).await;

        let _guard = self.run_lock.lock().await;
        let runner = PipelineRunner::new(&self.hardware, &self.publisher);
        match runner
            .run(&pipeline, &others, &CancellationToken::new())
            .await
        {
            Ok(_) => {
                tracing::info!("pipeline ran");
                Ok(())
            }
            Err(err) => {
                tracing::error!(%err, "pipeline failed");
                Err(err)
            }
        }
    }

    /// Run the manual pipeline identified by `id`.
    ///
    /// Does nothing if there is no such pipeline or if it has a trigger.
    ///
    /// # Errors
    ///
    /// Same as [`run_now`](Self::run_now).
    pub async fn run_now_by_id(&self, id: PipelineId) -> Result<(), AutomationError> {
        let pipeline = {
            let config = self.config.lock().await;
            config
                .pipelines
                .iter()
                .find(|p| p.id == id && p.is_manual())
                .cloned()
        };
        match pipeline {
            Some(pipeline) => self.run_now(&pipeline).await,
            None => {
                tracing::debug!(pipeline = %id, "no manual pipeline with this id");
                Ok(())
            }
        }
    }

    /// Evaluate `event` against the pipelines and run the matching ones.
    ///
    /// Failures of individual pipelines are logged and never returned.
    pub async fn process_event(&self, event: AutomationEvent) {
        if !self.has_matching_trigger(&event).await {
            tracing::debug!(%event, "no trigger matches event");
            return;
        }
        self.run(&event).await;
    }

    /// Cancel the in-flight run and stop every listener.
    pub async fn shutdown(&self) {
        if let Some(token) = self.lock_current_run().take() {
            token.cancel();
        }
        let mut config = self.config.lock().await;
        for kind in std::mem::take(&mut config.active) {
            self.listeners.stop_optional(kind);
        }
        if config.core_started {
            self.listeners.stop_core();
            config.core_started = false;
        }
        tracing::info!("automation shut down");
    }

    async fn has_matching_trigger(&self, event: &AutomationEvent) -> bool {
        let pipelines = Arc::clone(&self.config.lock().await.pipelines);
        let checks: Vec<_> = pipelines
            .iter()
            .filter_map(|p| p.trigger.as_ref())
            .map(|trigger| matching::is_matching_event(trigger, event, &self.probe))
            .collect();
        join_all(checks).await.into_iter().any(|matched| matched)
    }

    async fn run(&self, event: &AutomationEvent) {
        let token = CancellationToken::new();
        let previous = self.lock_current_run().replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let _guard = self.run_lock.lock().await;
        if token.is_cancelled() {
            tracing::debug!(%event, "run superseded before it started");
            return;
        }

        let (is_enabled, pipelines) = {
            let config = self.config.lock().await;
            (config.is_enabled, Arc::clone(&config.pipelines))
        };
        if !is_enabled {
            tracing::debug!(%event, "automation disabled, dropping event");
            return;
        }

        let runner = PipelineRunner::new(&self.hardware, &self.publisher);
        for pipeline in pipelines.iter() {
            if token.is_cancelled() {
                tracing::debug!(%event, "run superseded by a newer event");
                break;
            }
            let Some(trigger) = &pipeline.trigger else {
                continue;
            };
            if !matching::is_matching_event(trigger, event, &self.probe).await {
                continue;
            }

            let others: Vec<Pipeline> = pipelines
                .iter()
                .filter(|p| p.id != pipeline.id)
                .cloned()
                .collect();
            tracing::info!(pipeline = %pipeline.id, name = %pipeline.name, %event, "running pipeline");
            if let Err(err) = runner.run(pipeline, &others, &token).await {
                tracing::error!(%err, pipeline = %pipeline.id, name = %pipeline.name, "pipeline failed");
            }

            if pipeline.is_exclusive {
                tracing::debug!(pipeline = %pipeline.id, "exclusive pipeline ran, stopping");
                break;
            }
        }
    }

    async fn others(&self, id: &PipelineId) -> Vec<Pipeline> {
        let config = self.config.lock().await;
        config
            .pipelines
            .iter()
            .filter(|p| p.id != *id)
            .cloned()
            .collect()
    }

    fn update_listeners(&self, config: &mut ConfigState) {
        for kind in ListenerKind::ALL {
            self.listeners.stop_optional(kind);
        }

        let wanted = if config.is_enabled {
            required_listeners(config.pipelines.iter())
        } else {
            BTreeSet::new()
        };
        for kind in &wanted {
            self.start_optional(*kind);
        }

        if wanted != config.active {
            tracing::info!(
                listeners = ?wanted.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "optional listeners updated"
            );
        }
        config.active = wanted;
    }

    fn start_core_listeners(&self) {
        let l = &self.listeners;
        l.power_state.start(self.handler());
        l.power_mode.start(self.handler());
        l.hdr.start(self.handler());
        l.native_message.start(self.handler());
        l.session.start(self.handler());
        l.preset.start(self.handler());
    }

    fn start_optional(&self, kind: ListenerKind) {
        let l = &self.listeners;
        match kind {
            ListenerKind::Game => l.game.start(self.handler()),
            ListenerKind::Process => l.process.start(self.handler()),
            ListenerKind::Time => l.time.start(self.handler()),
            ListenerKind::Inactivity => l.inactivity.start(self.handler()),
            ListenerKind::Wifi => l.wifi.start(self.handler()),
        }
    }

    /// Bridge a synchronous listener callback to an event-processing task.
    fn handler<T>(&self) -> ChangedHandler<T>
    where
        T: Into<AutomationEvent> + Send + 'static,
    {
        let this = self.this.clone();
        Arc::new(move |payload: T| {
            let Some(processor) = this.upgrade() else {
                return;
            };
            let event = payload.into();
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(async move { processor.process_event(event).await });
                }
                Err(_) => {
                    tracing::warn!(%event, "no async runtime available, event dropped");
                }
            }
        })
    }

    fn lock_current_run(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.current_run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
