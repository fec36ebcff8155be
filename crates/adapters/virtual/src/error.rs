//! Errors raised by the simulated machine.

use autotune_domain::error::{AutomationError, HardwareError};
use autotune_domain::state::FeatureKind;

#[derive(Debug, thiserror::Error)]
pub enum VirtualError {
    /// The feature was put in failing mode.
    #[error("virtual {feature} is not responding")]
    NotResponding { feature: FeatureKind },

    /// The probe was switched offline.
    #[error("virtual system probe is offline")]
    ProbeOffline,
}

impl From<VirtualError> for AutomationError {
    fn from(err: VirtualError) -> Self {
        let feature = match &err {
            VirtualError::NotResponding { feature } => feature.as_str(),
            VirtualError::ProbeOffline => "probe",
        };
        Self::Hardware(HardwareError::Failed {
            feature,
            source: Box::new(err),
        })
    }
}
