//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`AutomationError`] via `#[from]` / `From` impls. Adapters box their
//! own error types into [`AutomationError::Storage`].

/// Base error for every fallible operation in autotune.
#[derive(Debug, thiserror::Error)]
pub enum AutomationError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A hardware feature could not be read or written.
    #[error("hardware error")]
    Hardware(#[from] HardwareError),

    /// A persistence or IO adapter failed.
    #[error("storage error")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// An external program could not be started.
    #[error("failed to run program {path}")]
    Program {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AutomationError {
    /// Whether this error means "the probed hardware class does not exist on
    /// this machine". Such errors are treated as "unsupported", never as
    /// failures.
    #[must_use]
    pub fn is_capability_absent(&self) -> bool {
        matches!(self, Self::Hardware(HardwareError::CapabilityAbsent { .. }))
    }
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A pipeline must have a non-empty name.
    #[error("name must not be empty")]
    EmptyName,

    /// A composite trigger must wrap at least one trigger.
    #[error("composite trigger must not be empty")]
    EmptyCompositeTrigger,

    /// A periodic trigger needs a non-zero period.
    #[error("period must be greater than zero")]
    ZeroPeriod,

    /// A time-of-day trigger must name a time, sunrise or sunset.
    #[error("time-of-day trigger has no time, sunrise or sunset")]
    NoTimeOfDay,

    /// Latitude must be within ±90° and longitude within ±180°.
    #[error("coordinates out of range")]
    InvalidCoordinates,
}

/// Errors raised by hardware feature bindings.
#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    /// The hardware class backing a feature does not exist on this machine.
    #[error("hardware class {class} is not present")]
    CapabilityAbsent {
        /// Name of the missing class or probe.
        class: String,
    },

    /// The feature exists but the call failed.
    #[error("{feature} call failed")]
    Failed {
        /// Feature that failed.
        feature: &'static str,
        /// Underlying cause.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_capability_absent_when_class_missing() {
        let err: AutomationError = HardwareError::CapabilityAbsent {
            class: "LENOVO_GAMEZONE_DATA".to_string(),
        }
        .into();
        assert!(err.is_capability_absent());
    }

    #[test]
    fn should_not_report_capability_absent_for_failed_call() {
        let err: AutomationError = HardwareError::Failed {
            feature: "power_mode",
            source: "timeout".into(),
        }
        .into();
        assert!(!err.is_capability_absent());
    }

    #[test]
    fn should_keep_io_error_as_source_of_program_error() {
        let err = AutomationError::Program {
            path: "/bin/missing".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(err.to_string(), "failed to run program /bin/missing");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn should_display_capability_absent_error() {
        let err = HardwareError::CapabilityAbsent {
            class: "FAN_METHOD".to_string(),
        };
        assert_eq!(err.to_string(), "hardware class FAN_METHOD is not present");
    }
}
