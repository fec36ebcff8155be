//! Listener activation — which optional listeners the current pipelines need.
//!
//! Some event sources are expensive to keep hooked (process enumeration,
//! idle-time polling, a wall-clock ticker). They are only started when at
//! least one pipeline has a trigger that could react to them. The mapping
//! is a plain table so it can be tested without a processor.

use std::collections::BTreeSet;
use std::fmt;

use autotune_domain::pipeline::{Pipeline, Trigger};

/// Listeners that are started on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ListenerKind {
    Game,
    Process,
    Time,
    Inactivity,
    Wifi,
}

impl ListenerKind {
    /// Every optional listener.
    pub const ALL: [Self; 5] = [
        Self::Game,
        Self::Process,
        Self::Time,
        Self::Inactivity,
        Self::Wifi,
    ];

    /// Whether a leaf trigger needs this listener.
    #[must_use]
    pub fn is_required_by(self, trigger: &Trigger) -> bool {
        ACTIVATION_RULES
            .iter()
            .any(|(kind, rule)| *kind == self && rule(trigger))
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Game => "game",
            Self::Process => "process",
            Self::Time => "time",
            Self::Inactivity => "inactivity",
            Self::Wifi => "wifi",
        })
    }
}

type ActivationRule = fn(&Trigger) -> bool;

const ACTIVATION_RULES: &[(ListenerKind, ActivationRule)] = &[
    (ListenerKind::Game, |t| {
        matches!(t, Trigger::GamesRunning | Trigger::GamesStopped)
    }),
    (ListenerKind::Process, |t| {
        matches!(
            t,
            Trigger::ProcessesStarted { .. } | Trigger::ProcessesStopped { .. }
        )
    }),
    (ListenerKind::Time, |t| {
        matches!(t, Trigger::TimeOfDay { .. } | Trigger::Periodic { .. })
    }),
    (ListenerKind::Inactivity, |t| {
        matches!(t, Trigger::UserInactivity { .. })
    }),
    (ListenerKind::Wifi, |t| {
        matches!(t, Trigger::WifiConnected { .. } | Trigger::WifiDisconnected)
    }),
];

/// Optional listeners required by any trigger of `pipelines`, composites
/// included.
pub fn required_listeners<'a>(
    pipelines: impl IntoIterator<Item = &'a Pipeline>,
) -> BTreeSet<ListenerKind> {
    let leaves: Vec<&Trigger> = pipelines
        .into_iter()
        .filter_map(|p| p.trigger.as_ref())
        .flat_map(Trigger::flatten)
        .collect();

    ListenerKind::ALL
        .into_iter()
        .filter(|kind| leaves.iter().any(|t| kind.is_required_by(t)))
        .collect()
}
