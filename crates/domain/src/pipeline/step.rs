//! Step — one action executed when a pipeline runs.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::id::PipelineId;
use crate::state::{
    AlwaysOnUsbState, BatteryState, FanFullSpeedState, FeatureState, OverdriveState,
    PowerModeState, RefreshRate,
};

/// Drive a hardware feature to `state`, if it is not already there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureStep<T> {
    pub state: T,
}

impl<T: FeatureState> FeatureStep<T> {
    #[must_use]
    pub fn new(state: T) -> Self {
        Self { state }
    }
}

/// An action within a pipeline. Steps run sequentially, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    PowerMode(FeatureStep<PowerModeState>),
    BatteryMode(FeatureStep<BatteryState>),
    FanFullSpeed(FeatureStep<FanFullSpeedState>),
    Overdrive(FeatureStep<OverdriveState>),
    AlwaysOnUsb(FeatureStep<AlwaysOnUsbState>),
    RefreshRate(FeatureStep<RefreshRate>),
    /// Wait before continuing with the next step.
    Delay { millis: u64 },
    /// Show a message to the user.
    Notify { message: String },
    /// Run the steps of another pipeline.
    RunPipeline { pipeline_id: PipelineId },
    /// Spawn an external program with the run's environment.
    RunProgram {
        path: String,
        #[serde(default)]
        args: Vec<String>,
        /// Wait for the program to exit and capture its output.
        #[serde(default)]
        wait: bool,
    },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PowerMode(s) => write!(f, "power_mode({})", s.state),
            Self::BatteryMode(s) => write!(f, "battery_mode({})", s.state),
            Self::FanFullSpeed(s) => write!(f, "fan_full_speed({})", s.state),
            Self::Overdrive(s) => write!(f, "overdrive({})", s.state),
            Self::AlwaysOnUsb(s) => write!(f, "always_on_usb({})", s.state),
            Self::RefreshRate(s) => write!(f, "refresh_rate({})", s.state),
            Self::Delay { millis } => write!(f, "delay({millis}ms)"),
            Self::Notify { .. } => f.write_str("notify"),
            Self::RunPipeline { pipeline_id } => write!(f, "run_pipeline({pipeline_id})"),
            Self::RunProgram { path, .. } => write!(f, "run_program({path})"),
        }
    }
}
