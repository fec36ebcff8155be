//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the automation core and the outside
//! world: hardware features, event sources, the settings store, the
//! notification bus and the system probe. They are defined here (in `app`)
//! so that both the processor and the adapters can depend on them without
//! creating circular dependencies.

pub mod feature;
pub mod listener;
pub mod notification;
pub mod probe;
pub mod settings;

pub use feature::{Feature, Hardware};
pub use listener::{ChangedHandler, EventSource, Listener};
pub use notification::NotificationPublisher;
pub use probe::{DisplayStatus, SystemProbe};
pub use settings::SettingsStore;
