//! Notifications — fire-and-forget messages published for observers (UI).

use serde::{Deserialize, Serialize};

use crate::pipeline::Pipeline;
use crate::state::{FeatureKind, FeatureState};
use crate::time::{Timestamp, now};

/// A message published on the notification bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub at: Timestamp,
    pub kind: NotificationKind,
}

impl Notification {
    /// Stamp `kind` with the current time.
    #[must_use]
    pub fn new(kind: NotificationKind) -> Self {
        Self { at: now(), kind }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationKind {
    /// The pipeline list was replaced. Carries a copy of the new list.
    PipelinesChanged { pipelines: Vec<Pipeline> },
    /// A step changed a hardware feature.
    FeatureStateChanged(FeatureStateMessage),
    /// A user-facing message emitted by a notify step.
    Message { text: String },
}

impl NotificationKind {
    #[must_use]
    pub fn topic(&self) -> NotificationTopic {
        match self {
            Self::PipelinesChanged { .. } => NotificationTopic::Pipelines,
            Self::FeatureStateChanged(_) => NotificationTopic::FeatureState,
            Self::Message { .. } => NotificationTopic::Message,
        }
    }
}

/// Coarse category of a notification, for subscribers that only care
/// about one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationTopic {
    Pipelines,
    FeatureState,
    Message,
}

/// A hardware feature reached a new state.
///
/// The state is stored as JSON so the message is not generic; use
/// [`FeatureStateMessage::state_as`] to read it back as its typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStateMessage {
    pub feature: FeatureKind,
    pub state: serde_json::Value,
}

impl FeatureStateMessage {
    #[must_use]
    pub fn new<T: FeatureState>(state: &T) -> Self {
        Self {
            feature: T::FEATURE,
            state: serde_json::to_value(state).unwrap_or(serde_json::Value::Null),
        }
    }

    /// The typed state, if this message is about `T`'s feature.
    #[must_use]
    pub fn state_as<T: FeatureState>(&self) -> Option<T> {
        if self.feature != T::FEATURE {
            return None;
        }
        serde_json::from_value(self.state.clone()).ok()
    }
}
