//! Listener port — on-demand subscriptions to external event sources.
//!
//! A [`Listener`] is what the processor switches on and off. An
//! [`EventSource`] is the raw hook into the OS signal (power notifications,
//! process watcher, Wi-Fi API, …) that a listener drains.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;

use autotune_domain::error::AutomationError;

/// Callback invoked for every payload a listener receives.
///
/// Handlers are synchronous and must not block: the processor's handler
/// only spawns a task.
pub type ChangedHandler<T> = Arc<dyn Fn(T) + Send + Sync>;

/// A switchable subscription to one category of events.
///
/// Both methods are idempotent. A listener whose source turned out to be
/// unavailable stays unsupported for the rest of the process lifetime and
/// ignores further `start` calls.
pub trait Listener<T>: Send + Sync {
    /// Subscribe `handler` and start delivering payloads to it.
    fn start(&self, handler: ChangedHandler<T>);

    /// Unsubscribe and stop delivering payloads.
    fn stop(&self);

    /// Whether payloads are currently being delivered.
    fn is_running(&self) -> bool;

    /// `false` once the underlying source failed to open.
    fn is_supported(&self) -> bool;
}

/// Raw hook into an OS event source.
pub trait EventSource<T>: Send + Sync + 'static {
    /// Hook the underlying signal and return a receiver of its payloads.
    ///
    /// # Errors
    ///
    /// Fails when the signal cannot be hooked on this machine.
    fn open(&self) -> impl Future<Output = Result<broadcast::Receiver<T>, AutomationError>> + Send;
}
