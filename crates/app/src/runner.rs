//! Pipeline runner — executes the steps of one pipeline, in order.
//!
//! Feature steps read the current state first and only write when it
//! differs from the desired one. A step whose hardware class is absent is
//! skipped; any other error aborts the pipeline and is returned to the
//! caller, which decides whether to log it or propagate it.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use autotune_domain::error::AutomationError;
use autotune_domain::notification::{FeatureStateMessage, Notification, NotificationKind};
use autotune_domain::pipeline::{AutomationEnvironment, ENV_PREFIX, FeatureStep, Pipeline, Step};
use autotune_domain::state::FeatureState;

use crate::ports::{Feature, Hardware, NotificationPublisher};

/// Mutable state shared by the steps of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutomationContext {
    /// Trimmed standard output of the last program step that was waited on.
    pub last_run_output: Option<String>,
}

/// Executes pipelines against a [`Hardware`] set.
pub struct PipelineRunner<'a, H, P> {
    hardware: &'a H,
    publisher: &'a P,
}

impl<'a, H, P> PipelineRunner<'a, H, P>
where
    H: Hardware,
    P: NotificationPublisher,
{
    pub fn new(hardware: &'a H, publisher: &'a P) -> Self {
        Self {
            hardware,
            publisher,
        }
    }

    /// Run every supported step of `pipeline`, in order.
    ///
    /// `others` are the sibling pipelines, used by steps that run another
    /// pipeline. `token` is only observed by steps that wait.
    ///
    /// # Errors
    ///
    /// Returns the first step error that is not a missing hardware class.
    pub async fn run(
        &self,
        pipeline: &Pipeline,
        others: &[Pipeline],
        token: &CancellationToken,
    ) -> Result<AutomationContext, AutomationError> {
        let mut environment = AutomationEnvironment::default();
        if let Some(trigger) = &pipeline.trigger {
            trigger.update_environment(&mut environment);
        }
        let mut context = AutomationContext::default();

        for step in &pipeline.steps {
            if let Step::RunPipeline { pipeline_id } = step {
                let Some(target) = others.iter().find(|p| p.id == *pipeline_id) else {
                    tracing::warn!(pipeline = %pipeline.id, target = %pipeline_id, "referenced pipeline not found, skipping step");
                    continue;
                };
                tracing::debug!(pipeline = %pipeline.id, target = %target.id, "running sibling pipeline steps");
                for nested in &target.steps {
                    if matches!(nested, Step::RunPipeline { .. }) {
                        tracing::debug!(target = %target.id, "nested pipeline reference skipped");
                        continue;
                    }
                    self.run_step(nested, &mut context, &environment, token)
                        .await?;
                }
                continue;
            }
            self.run_step(step, &mut context, &environment, token)
                .await?;
        }

        Ok(context)
    }

    /// Whether `step` can run on this machine. A missing hardware class is
    /// reported as unsupported, not as an error.
    ///
    /// # Errors
    ///
    /// Propagates probe failures other than a missing hardware class.
    pub async fn is_supported(&self, step: &Step) -> Result<bool, AutomationError> {
        let hw = self.hardware;
        let supported = match step {
            Step::PowerMode(_) => hw.power_mode().is_supported().await,
            Step::BatteryMode(_) => hw.battery_mode().is_supported().await,
            Step::FanFullSpeed(_) => hw.fan_full_speed().is_supported().await,
            Step::Overdrive(_) => hw.overdrive().is_supported().await,
            Step::AlwaysOnUsb(_) => hw.always_on_usb().is_supported().await,
            Step::RefreshRate(_) => hw.refresh_rate().is_supported().await,
            Step::RunProgram { path, .. } => Ok(!path.trim().is_empty()),
            Step::Delay { .. } | Step::Notify { .. } | Step::RunPipeline { .. } => Ok(true),
        };
        match supported {
            Err(err) if err.is_capability_absent() => Ok(false),
            other => other,
        }
    }

    async fn run_step(
        &self,
        step: &Step,
        context: &mut AutomationContext,
        environment: &AutomationEnvironment,
        token: &CancellationToken,
    ) -> Result<(), AutomationError> {
        if !self.is_supported(step).await? {
            tracing::debug!(%step, "step not supported on this machine, skipping");
            return Ok(());
        }

        let hw = self.hardware;
        let result = match step {
            Step::PowerMode(s) => self.apply(hw.power_mode(), s).await,
            Step::BatteryMode(s) => self.apply(hw.battery_mode(), s).await,
            Step::FanFullSpeed(s) => self.apply(hw.fan_full_speed(), s).await,
            Step::Overdrive(s) => self.apply(hw.overdrive(), s).await,
            Step::AlwaysOnUsb(s) => self.apply(hw.always_on_usb(), s).await,
            Step::RefreshRate(s) => self.apply(hw.refresh_rate(), s).await,
            Step::Delay { millis } => {
                delay(Duration::from_millis(*millis), token).await;
                Ok(())
            }
            Step::Notify { message } => {
                let notification = Notification::new(NotificationKind::Message {
                    text: message.clone(),
                });
                self.publisher.publish(notification);
                Ok(())
            }
            Step::RunProgram { path, args, wait } => {
                run_program(path, args, *wait, context, environment).await
            }
            // Only reached for nested references, which are skipped upstream.
            Step::RunPipeline { .. } => Ok(()),
        };

        match result {
            Err(err) if err.is_capability_absent() => {
                tracing::debug!(%err, %step, "hardware class absent, skipping step");
                Ok(())
            }
            other => other,
        }
    }

    async fn apply<T, F>(&self, feature: &F, step: &FeatureStep<T>) -> Result<(), AutomationError>
    where
        T: FeatureState,
        F: Feature<T>,
    {
        let available = feature.get_all_states().await?;
        if !available.is_empty() && !available.contains(&step.state) {
            tracing::warn!(feature = %T::FEATURE, state = %step.state, "state not offered by this machine, skipping step");
            return Ok(());
        }

        let current = feature.get_state().await?;
        if current == step.state {
            tracing::debug!(feature = %T::FEATURE, state = %current, "already in desired state");
            return Ok(());
        }

        feature.set_state(step.state.clone()).await?;
        tracing::info!(feature = %T::FEATURE, from = %current, to = %step.state, "feature state changed");

        let message = FeatureStateMessage::new(&step.state);
        self.publisher
            .publish(Notification::new(NotificationKind::FeatureStateChanged(
                message,
            )));
        Ok(())
    }
}

/// Sleep for `duration`, returning early if the run is superseded.
async fn delay(duration: Duration, token: &CancellationToken) {
    tokio::select! {
        () = tokio::time::sleep(duration) => {}
        () = token.cancelled() => {
            tracing::debug!("delay interrupted by a newer run");
        }
    }
}

async fn run_program(
    path: &str,
    args: &[String],
    wait: bool,
    context: &mut AutomationContext,
    environment: &AutomationEnvironment,
) -> Result<(), AutomationError> {
    let mut command = tokio::process::Command::new(path);
    command.args(args).envs(environment.iter());
    if let Some(output) = &context.last_run_output {
        command.env(format!("{ENV_PREFIX}LAST_RUN_OUTPUT"), output);
    }

    let program_error = |source| AutomationError::Program {
        path: path.to_string(),
        source,
    };

    if wait {
        let output = command.output().await.map_err(program_error)?;
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(path, status = %output.status, "program finished");
        context.last_run_output = Some(stdout);
    } else {
        command.spawn().map_err(program_error)?;
        tracing::debug!(path, "program started");
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    use autotune_domain::error::HardwareError;
    use autotune_domain::id::PipelineId;
    use autotune_domain::pipeline::Trigger;
    use autotune_domain::state::{
        AlwaysOnUsbState, BatteryState, FanFullSpeedState, FeatureKind, OverdriveState,
        PowerModeState, RefreshRate,
    };

    /// How a [`RecordingFeature`] behaves.
    #[derive(Clone, Copy, PartialEq, Eq)]
    pub(crate) enum Behaviour {
        Works,
        ClassAbsent,
        Fails,
        Unsupported,
    }

    /// In-memory feature that records every write.
    pub(crate) struct RecordingFeature<T> {
        pub state: Mutex<T>,
        pub writes: Mutex<Vec<T>>,
        pub offered: Vec<T>,
        pub behaviour: Behaviour,
        /// How long a write takes.
        pub latency: Duration,
    }

    impl<T: FeatureState> RecordingFeature<T> {
        pub fn new(state: T) -> Self {
            Self {
                state: Mutex::new(state),
                writes: Mutex::new(Vec::new()),
                offered: Vec::new(),
                behaviour: Behaviour::Works,
                latency: Duration::ZERO,
            }
        }

        pub fn with(state: T, behaviour: Behaviour) -> Self {
            Self {
                behaviour,
                ..Self::new(state)
            }
        }

        pub fn writes(&self) -> Vec<T> {
            self.writes.lock().unwrap().clone()
        }

        fn check(&self) -> Result<(), AutomationError> {
            match self.behaviour {
                Behaviour::ClassAbsent => Err(HardwareError::CapabilityAbsent {
                    class: T::FEATURE.to_string(),
                }
                .into()),
                Behaviour::Fails => Err(HardwareError::Failed {
                    feature: T::FEATURE.as_str(),
                    source: "device busy".into(),
                }
                .into()),
                Behaviour::Works | Behaviour::Unsupported => Ok(()),
            }
        }
    }

    impl<T: FeatureState> Feature<T> for RecordingFeature<T> {
        async fn is_supported(&self) -> Result<bool, AutomationError> {
            Ok(self.behaviour != Behaviour::Unsupported)
        }

        async fn get_state(&self) -> Result<T, AutomationError> {
            self.check()?;
            Ok(self.state.lock().unwrap().clone())
        }

        async fn set_state(&self, state: T) -> Result<(), AutomationError> {
            self.check()?;
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.writes.lock().unwrap().push(state.clone());
            *self.state.lock().unwrap() = state;
            Ok(())
        }

        async fn get_all_states(&self) -> Result<Vec<T>, AutomationError> {
            self.check()?;
            Ok(self.offered.clone())
        }
    }

    pub(crate) struct TestHardware {
        pub power_mode: RecordingFeature<PowerModeState>,
        pub battery: RecordingFeature<BatteryState>,
        pub fan: RecordingFeature<FanFullSpeedState>,
        pub overdrive: RecordingFeature<OverdriveState>,
        pub usb: RecordingFeature<AlwaysOnUsbState>,
        pub refresh_rate: RecordingFeature<RefreshRate>,
    }

    impl Default for TestHardware {
        fn default() -> Self {
            Self {
                power_mode: RecordingFeature::new(PowerModeState::Balance),
                battery: RecordingFeature::new(BatteryState::Normal),
                fan: RecordingFeature::new(FanFullSpeedState::On),
                overdrive: RecordingFeature::new(OverdriveState::Off),
                usb: RecordingFeature::new(AlwaysOnUsbState::Off),
                refresh_rate: RecordingFeature::new(RefreshRate(60)),
            }
        }
    }

    impl Hardware for TestHardware {
        type PowerMode = RecordingFeature<PowerModeState>;
        type BatteryMode = RecordingFeature<BatteryState>;
        type FanFullSpeed = RecordingFeature<FanFullSpeedState>;
        type Overdrive = RecordingFeature<OverdriveState>;
        type AlwaysOnUsb = RecordingFeature<AlwaysOnUsbState>;
        type RefreshRate = RecordingFeature<RefreshRate>;

        fn power_mode(&self) -> &Self::PowerMode {
            &self.power_mode
        }
        fn battery_mode(&self) -> &Self::BatteryMode {
            &self.battery
        }
        fn fan_full_speed(&self) -> &Self::FanFullSpeed {
            &self.fan
        }
        fn overdrive(&self) -> &Self::Overdrive {
            &self.overdrive
        }
        fn always_on_usb(&self) -> &Self::AlwaysOnUsb {
            &self.usb
        }
        fn refresh_rate(&self) -> &Self::RefreshRate {
            &self.refresh_rate
        }
    }

    #[derive(Default)]
    pub(crate) struct SpyPublisher {
        pub notifications: Mutex<Vec<Notification>>,
    }

    impl SpyPublisher {
        pub fn messages(&self) -> Vec<String> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .filter_map(|n| match &n.kind {
                    NotificationKind::Message { text } => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn feature_changes(&self) -> Vec<FeatureStateMessage> {
            self.notifications
                .lock()
                .unwrap()
                .iter()
                .filter_map(|n| match &n.kind {
                    NotificationKind::FeatureStateChanged(m) => Some(m.clone()),
                    _ => None,
                })
                .collect()
        }
    }

    impl NotificationPublisher for SpyPublisher {
        fn publish(&self, notification: Notification) {
            self.notifications.lock().unwrap().push(notification);
        }
    }

    fn pipeline(steps: Vec<Step>) -> Pipeline {
        steps
            .into_iter()
            .fold(Pipeline::builder().name("test"), |b, s| b.step(s))
            .build()
            .unwrap()
    }

    async fn run(
        hw: &TestHardware,
        spy: &SpyPublisher,
        pipeline: &Pipeline,
        others: &[Pipeline],
    ) -> Result<AutomationContext, AutomationError> {
        PipelineRunner::new(hw, spy)
            .run(pipeline, others, &CancellationToken::new())
            .await
    }

    #[tokio::test]
    async fn should_apply_state_when_it_differs() {
        let hw = TestHardware::default();
        let spy = SpyPublisher::default();
        let p = pipeline(vec![Step::PowerMode(FeatureStep::new(PowerModeState::Quiet))]);

        run(&hw, &spy, &p, &[]).await.unwrap();

        assert_eq!(hw.power_mode.writes(), vec![PowerModeState::Quiet]);
        let changes = spy.feature_changes();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].feature, FeatureKind::PowerMode);
        assert_eq!(changes[0].state_as(), Some(PowerModeState::Quiet));
    }

    #[tokio::test]
    async fn should_not_write_when_already_in_desired_state() {
        let hw = TestHardware::default();
        let spy = SpyPublisher::default();
        let p = pipeline(vec![Step::BatteryMode(FeatureStep::new(BatteryState::Normal))]);

        run(&hw, &spy, &p, &[]).await.unwrap();

        assert!(hw.battery.writes().is_empty());
        assert!(spy.feature_changes().is_empty());
    }

    #[tokio::test]
    async fn should_skip_state_not_offered_by_machine() {
        let mut hw = TestHardware::default();
        hw.refresh_rate.offered = vec![RefreshRate(60), RefreshRate(165)];
        let spy = SpyPublisher::default();
        let p = pipeline(vec![
            Step::RefreshRate(FeatureStep::new(RefreshRate(240))),
            Step::RefreshRate(FeatureStep::new(RefreshRate(165))),
        ]);

        run(&hw, &spy, &p, &[]).await.unwrap();

        assert_eq!(hw.refresh_rate.writes(), vec![RefreshRate(165)]);
    }

    #[tokio::test]
    async fn should_continue_with_remaining_steps_when_class_is_absent() {
        let hw = TestHardware {
            fan: RecordingFeature::with(FanFullSpeedState::On, Behaviour::ClassAbsent),
            ..TestHardware::default()
        };
        let spy = SpyPublisher::default();
        let p = pipeline(vec![
            Step::FanFullSpeed(FeatureStep::new(FanFullSpeedState::Off)),
            Step::Overdrive(FeatureStep::new(OverdriveState::On)),
        ]);

        run(&hw, &spy, &p, &[]).await.unwrap();

        assert!(hw.fan.writes().is_empty());
        assert_eq!(hw.overdrive.writes(), vec![OverdriveState::On]);
    }

    #[tokio::test]
    async fn should_skip_unsupported_step() {
        let hw = TestHardware {
            usb: RecordingFeature::with(AlwaysOnUsbState::Off, Behaviour::Unsupported),
            ..TestHardware::default()
        };
        let spy = SpyPublisher::default();
        let p = pipeline(vec![Step::AlwaysOnUsb(FeatureStep::new(
            AlwaysOnUsbState::OnAlways,
        ))]);

        run(&hw, &spy, &p, &[]).await.unwrap();

        assert!(hw.usb.writes().is_empty());
    }

    #[tokio::test]
    async fn should_abort_pipeline_when_step_fails() {
        let hw = TestHardware {
            power_mode: RecordingFeature::with(PowerModeState::Balance, Behaviour::Fails),
            ..TestHardware::default()
        };
        let spy = SpyPublisher::default();
        let p = pipeline(vec![
            Step::PowerMode(FeatureStep::new(PowerModeState::Quiet)),
            Step::Notify {
                message: "never".to_string(),
            },
        ]);

        let result = run(&hw, &spy, &p, &[]).await;

        assert!(matches!(result, Err(AutomationError::Hardware(_))));
        assert!(spy.messages().is_empty());
    }

    #[tokio::test]
    async fn should_run_sibling_pipeline_steps_without_recursing() {
        let hw = TestHardware::default();
        let spy = SpyPublisher::default();
        let sibling_id = PipelineId::new();
        let sibling = Pipeline::builder()
            .id(sibling_id)
            .name("sibling")
            .step(Step::Notify {
                message: "from sibling".to_string(),
            })
            .step(Step::RunPipeline {
                pipeline_id: sibling_id,
            })
            .build()
            .unwrap();
        let p = pipeline(vec![
            Step::RunPipeline {
                pipeline_id: sibling_id,
            },
            Step::RunPipeline {
                pipeline_id: PipelineId::new(),
            },
            Step::Notify {
                message: "after".to_string(),
            },
        ]);

        run(&hw, &spy, &p, &[sibling]).await.unwrap();

        assert_eq!(spy.messages(), vec!["from sibling", "after"]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_cut_delay_short_when_cancelled() {
        let hw = TestHardware::default();
        let spy = SpyPublisher::default();
        let p = pipeline(vec![Step::Delay { millis: 60_000 }]);
        let token = CancellationToken::new();
        token.cancel();

        let started = tokio::time::Instant::now();
        PipelineRunner::new(&hw, &spy)
            .run(&p, &[], &token)
            .await
            .unwrap();

        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test]
    async fn should_report_missing_program_as_error() {
        let hw = TestHardware::default();
        let spy = SpyPublisher::default();
        let p = pipeline(vec![Step::RunProgram {
            path: "/nonexistent/autotune-test-program".to_string(),
            args: vec![],
            wait: true,
        }]);

        let result = run(&hw, &spy, &p, &[]).await;

        assert!(matches!(result, Err(AutomationError::Program { .. })));
    }

    #[tokio::test]
    async fn should_treat_empty_program_path_as_unsupported() {
        let hw = TestHardware::default();
        let spy = SpyPublisher::default();
        let runner = PipelineRunner::new(&hw, &spy);
        let step = Step::RunProgram {
            path: "  ".to_string(),
            args: vec![],
            wait: false,
        };
        assert!(!runner.is_supported(&step).await.unwrap());
    }

    #[tokio::test]
    async fn should_leave_context_empty_when_no_program_ran() {
        let hw = TestHardware::default();
        let spy = SpyPublisher::default();
        let p = Pipeline::builder()
            .name("env")
            .trigger(Trigger::Startup)
            .step(Step::Notify {
                message: "hello".to_string(),
            })
            .build()
            .unwrap();
        let context = run(&hw, &spy, &p, &[]).await.unwrap();
        assert_eq!(context, AutomationContext::default());
        assert_eq!(spy.messages(), vec!["hello"]);
    }
}
