//! Environment variables exported to the steps of one pipeline run.

use std::collections::BTreeMap;

/// Prefix applied to every variable name.
pub const ENV_PREFIX: &str = "AUTOTUNE_";

/// Variables describing why a run happened, handed to program steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutomationEnvironment {
    vars: BTreeMap<String, String>,
}

impl AutomationEnvironment {
    /// Set `AUTOTUNE_<key>` to `value`.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.vars.insert(format!("{ENV_PREFIX}{key}"), value.into());
    }

    /// Set `AUTOTUNE_<key>` to `TRUE` or `FALSE`.
    pub fn set_flag(&mut self, key: &str, value: bool) {
        self.set(key, if value { "TRUE" } else { "FALSE" });
    }

    /// Look up a variable by its full (prefixed) name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_prefix_variable_names() {
        let mut env = AutomationEnvironment::default();
        env.set("POWER_MODE", "quiet");
        assert_eq!(env.get("AUTOTUNE_POWER_MODE"), Some("quiet"));
        assert_eq!(env.get("POWER_MODE"), None);
    }

    #[test]
    fn should_render_flags_in_upper_case() {
        let mut env = AutomationEnvironment::default();
        env.set_flag("STARTUP", true);
        env.set_flag("LID_OPEN", false);
        let pairs: Vec<_> = env.iter().collect();
        assert_eq!(
            pairs,
            vec![("AUTOTUNE_LID_OPEN", "FALSE"), ("AUTOTUNE_STARTUP", "TRUE")]
        );
    }
}
