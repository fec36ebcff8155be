//! # autotune-app
//!
//! Application layer — the automation processor and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `Feature<T>` / `Hardware` — read and drive hardware feature states
//!   - `Listener<T>` / `EventSource<T>` — switchable event subscriptions
//!   - `SettingsStore` — load & save automation settings
//!   - `NotificationPublisher` — fire-and-forget notifications for observers
//!   - `SystemProbe` — current machine state for composite triggers
//! - Provide the **driving/inbound** entry point, `AutomationProcessor`:
//!   event gating, debounce-by-cancellation, exclusive pipelines, listener
//!   activation, manual runs
//! - Provide **in-process infrastructure** that doesn't need IO (notification
//!   bus, stock listener over an event source)
//!
//! ## Dependency rule
//! Depends on `autotune-domain` only (plus `tokio`, `futures` for async
//! plumbing). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod activation;
pub mod listener;
pub mod matching;
pub mod notification_bus;
pub mod ports;
pub mod processor;
pub mod runner;
