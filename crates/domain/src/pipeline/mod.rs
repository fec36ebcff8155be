//! Pipeline — an optional trigger followed by an ordered list of steps.
//!
//! A pipeline with a [`Trigger`] runs whenever an event matches it. A
//! pipeline without one is manual-only: it runs when explicitly asked to,
//! by id, and never in response to an event.
//!
//! Pipelines are plain values. `Clone` is a deep copy (steps and triggers
//! are owned), which is how the processor isolates its internal list from
//! callers.

mod environment;
mod step;
mod trigger;

pub use environment::{AutomationEnvironment, ENV_PREFIX};
pub use step::{FeatureStep, Step};
pub use trigger::Trigger;

use serde::{Deserialize, Serialize};

use crate::error::{AutomationError, ValidationError};
use crate::id::PipelineId;

/// A named, identified rule: trigger → steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub name: String,
    #[serde(default)]
    pub trigger: Option<Trigger>,
    #[serde(default)]
    pub steps: Vec<Step>,
    /// When this pipeline matches and runs, no later pipeline is evaluated
    /// for the same event.
    #[serde(default)]
    pub is_exclusive: bool,
}

impl Pipeline {
    /// Create a builder for constructing a [`Pipeline`].
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// A pipeline without trigger can only be run by id.
    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.trigger.is_none()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - the trigger is malformed (see [`Trigger::validate`])
    pub fn validate(&self) -> Result<(), AutomationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let Some(trigger) = &self.trigger {
            trigger.validate()?;
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Pipeline`].
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    id: Option<PipelineId>,
    name: Option<String>,
    trigger: Option<Trigger>,
    steps: Vec<Step>,
    is_exclusive: bool,
}

impl PipelineBuilder {
    #[must_use]
    pub fn id(mut self, id: PipelineId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    #[must_use]
    pub fn exclusive(mut self, is_exclusive: bool) -> Self {
        self.is_exclusive = is_exclusive;
        self
    }

    /// Consume the builder, validate, and return a [`Pipeline`].
    ///
    /// A fresh [`PipelineId`] is generated unless one was given.
    ///
    /// # Errors
    ///
    /// Returns [`AutomationError::Validation`] if the name is missing or the
    /// trigger is malformed.
    pub fn build(self) -> Result<Pipeline, AutomationError> {
        let pipeline = Pipeline {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            trigger: self.trigger,
            steps: self.steps,
            is_exclusive: self.is_exclusive,
        };
        pipeline.validate()?;
        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{FanFullSpeedState, PowerModeState};

    fn quiet_pipeline() -> Pipeline {
        Pipeline::builder()
            .name("Quiet fans")
            .trigger(Trigger::PowerMode {
                state: PowerModeState::Quiet,
            })
            .step(Step::FanFullSpeed(FeatureStep::new(FanFullSpeedState::Off)))
            .exclusive(true)
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_valid_pipeline_when_required_fields_provided() {
        let pipeline = quiet_pipeline();
        assert_eq!(pipeline.name, "Quiet fans");
        assert!(pipeline.is_exclusive);
        assert!(!pipeline.is_manual());
        assert_eq!(pipeline.steps.len(), 1);
    }

    #[test]
    fn should_be_manual_when_no_trigger_given() {
        let pipeline = Pipeline::builder().name("Manual").build().unwrap();
        assert!(pipeline.is_manual());
        assert!(!pipeline.is_exclusive);
    }

    #[test]
    fn should_generate_distinct_ids() {
        assert_ne!(quiet_pipeline().id, quiet_pipeline().id);
    }

    #[test]
    fn should_return_validation_error_when_name_is_empty() {
        let result = Pipeline::builder().name("  ").build();
        assert!(matches!(
            result,
            Err(AutomationError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_return_validation_error_when_trigger_is_malformed() {
        let result = Pipeline::builder()
            .name("Broken")
            .trigger(Trigger::Periodic { period_minutes: 0 })
            .build();
        assert!(matches!(
            result,
            Err(AutomationError::Validation(ValidationError::ZeroPeriod))
        ));
    }

    #[test]
    fn should_deep_copy_on_clone() {
        let original = quiet_pipeline();
        let mut copy = original.clone();
        copy.steps.clear();
        copy.trigger = None;
        assert_eq!(original.steps.len(), 1);
        assert!(original.trigger.is_some());
    }

    #[test]
    fn should_roundtrip_pipeline_through_serde_json() {
        let pipeline = quiet_pipeline();
        let json = serde_json::to_string(&pipeline).unwrap();
        let parsed: Pipeline = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pipeline);
    }

    #[test]
    fn should_default_optional_fields_when_deserializing() {
        let json = serde_json::json!({
            "id": PipelineId::new(),
            "name": "Bare"
        });
        let pipeline: Pipeline = serde_json::from_value(json).unwrap();
        assert!(pipeline.is_manual());
        assert!(pipeline.steps.is_empty());
        assert!(!pipeline.is_exclusive);
    }
}
