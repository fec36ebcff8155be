//! Stock [`Listener`] implementation draining an [`EventSource`].

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::ports::{ChangedHandler, EventSource, Listener};

/// Forwards payloads from an [`EventSource`] to the subscribed handler.
///
/// `start` spawns a forwarding task that opens the source and calls the
/// handler once per payload; `stop` aborts it. If opening the source fails,
/// the listener latches itself unsupported and every later `start` is a
/// no-op, so an absent OS hook is reported once instead of on every reload.
pub struct SourceListener<T, S> {
    name: &'static str,
    source: Arc<S>,
    task: Mutex<Option<JoinHandle<()>>>,
    unsupported: Arc<AtomicBool>,
    _payload: PhantomData<fn() -> T>,
}

impl<T, S> SourceListener<T, S> {
    /// Wrap `source`. `name` only appears in logs.
    #[must_use]
    pub fn new(name: &'static str, source: Arc<S>) -> Self {
        Self {
            name,
            source,
            task: Mutex::new(None),
            unsupported: Arc::new(AtomicBool::new(false)),
            _payload: PhantomData,
        }
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T, S> Listener<T> for SourceListener<T, S>
where
    T: Clone + Send + 'static,
    S: EventSource<T>,
{
    fn start(&self, handler: ChangedHandler<T>) {
        if self.unsupported.load(Ordering::Acquire) {
            return;
        }
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return;
        }

        let name = self.name;
        let source = Arc::clone(&self.source);
        let unsupported = Arc::clone(&self.unsupported);
        *task = Some(tokio::spawn(async move {
            let receiver = match source.open().await {
                Ok(receiver) => receiver,
                Err(err) => {
                    unsupported.store(true, Ordering::Release);
                    tracing::warn!(%err, listener = name, "event source unavailable, listener disabled");
                    return;
                }
            };
            tracing::debug!(listener = name, "listener started");

            let mut stream = BroadcastStream::new(receiver);
            while let Some(item) = stream.next().await {
                match item {
                    Ok(payload) => handler(payload),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::debug!(listener = name, skipped, "listener lagged behind source");
                    }
                }
            }
            tracing::debug!(listener = name, "event source closed");
        }));
    }

    fn stop(&self) {
        if let Some(task) = self.lock_task().take() {
            task.abort();
            tracing::debug!(listener = self.name, "listener stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.lock_task().as_ref().is_some_and(|t| !t.is_finished())
    }

    fn is_supported(&self) -> bool {
        !self.unsupported.load(Ordering::Acquire)
    }
}

impl<T, S> Drop for SourceListener<T, S> {
    fn drop(&mut self) {
        if let Some(task) = self.lock_task().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use autotune_domain::error::{AutomationError, HardwareError};
    use tokio::sync::broadcast;

    struct TestSource {
        sender: broadcast::Sender<u32>,
        opens: AtomicUsize,
        fail: bool,
    }

    impl TestSource {
        fn new(fail: bool) -> Arc<Self> {
            let (sender, _) = broadcast::channel(16);
            Arc::new(Self {
                sender,
                opens: AtomicUsize::new(0),
                fail,
            })
        }
    }

    impl EventSource<u32> for TestSource {
        async fn open(&self) -> Result<broadcast::Receiver<u32>, AutomationError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HardwareError::CapabilityAbsent {
                    class: "WMI_EVENT".to_string(),
                }
                .into());
            }
            Ok(self.sender.subscribe())
        }
    }

    fn recording_handler() -> (ChangedHandler<u32>, Arc<Mutex<Vec<u32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: ChangedHandler<u32> = Arc::new(move |v| sink.lock().unwrap().push(v));
        (handler, seen)
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test]
    async fn should_forward_payloads_to_handler_when_started() {
        let source = TestSource::new(false);
        let listener = SourceListener::new("test", Arc::clone(&source));
        let (handler, seen) = recording_handler();

        listener.start(handler);
        settle().await;
        source.sender.send(7).unwrap();
        source.sender.send(8).unwrap();
        settle().await;

        assert!(listener.is_running());
        assert_eq!(*seen.lock().unwrap(), vec![7, 8]);
    }

    #[tokio::test]
    async fn should_stop_forwarding_when_stopped() {
        let source = TestSource::new(false);
        let listener = SourceListener::new("test", Arc::clone(&source));
        let (handler, seen) = recording_handler();

        listener.start(handler);
        settle().await;
        listener.stop();
        settle().await;
        let _ = source.sender.send(1);
        settle().await;

        assert!(!listener.is_running());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_ignore_second_start_while_running() {
        let source = TestSource::new(false);
        let listener = SourceListener::new("test", Arc::clone(&source));
        let (handler, _) = recording_handler();

        listener.start(Arc::clone(&handler));
        listener.start(handler);
        settle().await;

        assert_eq!(source.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_latch_unsupported_when_source_fails_to_open() {
        let source = TestSource::new(true);
        let listener = SourceListener::new("test", Arc::clone(&source));
        let (handler, _) = recording_handler();

        listener.start(Arc::clone(&handler));
        settle().await;
        assert!(!listener.is_supported());
        assert!(!listener.is_running());

        listener.start(handler);
        settle().await;
        assert_eq!(source.opens.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn should_allow_restart_after_stop() {
        let source = TestSource::new(false);
        let listener = SourceListener::new("test", Arc::clone(&source));
        let (handler, seen) = recording_handler();

        listener.start(Arc::clone(&handler));
        settle().await;
        listener.stop();
        listener.start(handler);
        settle().await;
        source.sender.send(3).unwrap();
        settle().await;

        assert_eq!(source.opens.load(Ordering::SeqCst), 2);
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }
}
