//! Persisted automation settings.

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;

/// Everything the settings store persists for the automation engine.
///
/// Automation is disabled until the user turns it on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationSettings {
    pub is_enabled: bool,
    pub pipelines: Vec<Pipeline>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_disabled_without_pipelines() {
        let settings = AutomationSettings::default();
        assert!(!settings.is_enabled);
        assert!(settings.pipelines.is_empty());
    }

    #[test]
    fn should_parse_empty_json_object_as_default() {
        let settings: AutomationSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, AutomationSettings::default());
    }
}
