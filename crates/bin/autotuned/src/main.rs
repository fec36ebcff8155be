//! # autotuned — autotune daemon
//!
//! Composition root that wires the adapters to the automation processor and
//! keeps it running.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Install the tracing subscriber
//! - Construct the machine adapter, the settings store and the notification bus
//! - Construct the processor, initialize it and fire the startup event
//! - Log notifications published on the bus
//! - Handle graceful shutdown (Ctrl-C)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use autotune_adapter_settings_json::JsonSettingsStore;
use autotune_adapter_virtual::{ClockSource, VirtualMachine};
use autotune_app::notification_bus::InProcessNotificationBus;
use autotune_app::processor::AutomationProcessor;
use autotune_domain::notification::Notification;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Adapters
    let machine = VirtualMachine::default();
    let location = config.location.coordinates()?;
    let clock = config.clock.enabled.then(|| ClockSource::new(location));
    let store = JsonSettingsStore::new(&config.settings.path);
    let settings_path = store.path().to_path_buf();
    let bus = Arc::new(InProcessNotificationBus::new(config.bus.capacity));
    let notifications = tokio::spawn(log_notifications(bus.subscribe()));

    // Processor
    let processor = AutomationProcessor::new(
        store,
        Arc::clone(&machine.hardware),
        Arc::clone(&bus),
        Arc::clone(&machine.probe),
        machine.listeners(clock),
    );
    processor.initialize().await?;
    let _startup = processor.run_on_startup().await;

    tracing::info!(
        settings = %settings_path.display(),
        clock = config.clock.enabled,
        sun = location.is_some(),
        "autotuned running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    processor.shutdown().await;
    notifications.abort();

    Ok(())
}

async fn log_notifications(mut receiver: broadcast::Receiver<Notification>) {
    loop {
        match receiver.recv().await {
            Ok(notification) => {
                tracing::info!(at = %notification.at, kind = ?notification.kind, "notification");
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "notification log lagged behind bus");
            }
            Err(RecvError::Closed) => break,
        }
    }
}
