//! Simulated event sources and the wall-clock ticker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{FixedOffset, Local, NaiveDateTime, Timelike};
use tokio::sync::broadcast;

use autotune_app::ports::EventSource;
use autotune_domain::error::{AutomationError, HardwareError};
use autotune_domain::event::TimeEvent;
use autotune_domain::sun::{Coordinates, SunTimes};
use autotune_domain::time::local_now;

const CHANNEL_CAPACITY: usize = 64;

/// An event source fed by hand through [`emit`](Self::emit).
pub struct VirtualSource<T> {
    name: &'static str,
    sender: broadcast::Sender<T>,
    available: AtomicBool,
}

impl<T: Clone + Send + 'static> VirtualSource<T> {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            name,
            sender,
            available: AtomicBool::new(true),
        }
    }

    /// Deliver `payload` to every open receiver. Returns how many got it.
    pub fn emit(&self, payload: T) -> usize {
        self.sender.send(payload).unwrap_or(0)
    }

    /// Number of receivers currently subscribed.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Make later `open` calls fail as if the OS hook did not exist.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }
}

impl<T: Clone + Send + 'static> EventSource<T> for VirtualSource<T> {
    async fn open(&self) -> Result<broadcast::Receiver<T>, AutomationError> {
        if !self.available.load(Ordering::Acquire) {
            return Err(HardwareError::CapabilityAbsent {
                class: self.name.to_string(),
            }
            .into());
        }
        Ok(self.sender.subscribe())
    }
}

/// Emits a [`TimeEvent`] at the start of every local minute.
///
/// With a location, ticks falling on the local sunrise or sunset minute
/// are flagged as such. Each `open` spawns its own ticker, which exits once
/// its receiver is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockSource {
    location: Option<Coordinates>,
}

impl ClockSource {
    #[must_use]
    pub fn new(location: Option<Coordinates>) -> Self {
        Self { location }
    }

    fn tick(&self, local: NaiveDateTime, offset: FixedOffset) -> TimeEvent {
        let sun = self
            .location
            .and_then(|location| SunTimes::on(local.date(), location, offset));
        TimeEvent::at(local).with_sun_times(sun)
    }
}

impl EventSource<TimeEvent> for ClockSource {
    async fn open(&self) -> Result<broadcast::Receiver<TimeEvent>, AutomationError> {
        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        let clock = *self;
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(until_next_minute()).await;
                let now = Local::now();
                if sender.send(clock.tick(now.naive_local(), *now.offset())).is_err() {
                    tracing::debug!("clock receiver dropped, ticker exiting");
                    break;
                }
            }
        });
        Ok(receiver)
    }
}

fn until_next_minute() -> Duration {
    let now = local_now();
    let elapsed = u64::from(now.second()) * 1_000 + u64::from(now.nanosecond() / 1_000_000);
    Duration::from_millis(60_000u64.saturating_sub(elapsed).max(1))
}
