//! In-process notification bus backed by a tokio broadcast channel.
//!
//! Observers either take everything ([`InProcessNotificationBus::subscribe`])
//! or a single [`NotificationTopic`] ([`InProcessNotificationBus::subscribe_to`]),
//! e.g. a settings view that only redraws on `PipelinesChanged`.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use autotune_domain::notification::{Notification, NotificationTopic};

use crate::ports::NotificationPublisher;

/// [`NotificationPublisher`] fanning notifications out to every subscriber.
///
/// A notification published while nobody is subscribed is dropped.
pub struct InProcessNotificationBus {
    sender: broadcast::Sender<Notification>,
}

impl InProcessNotificationBus {
    /// `capacity` notifications are buffered per subscriber before it lags.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Every notification published from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Only the notifications of `topic` published from now on.
    #[must_use]
    pub fn subscribe_to(&self, topic: NotificationTopic) -> TopicSubscription {
        TopicSubscription {
            topic,
            receiver: self.sender.subscribe(),
        }
    }
}

impl NotificationPublisher for InProcessNotificationBus {
    fn publish(&self, notification: Notification) {
        let topic = notification.kind.topic();
        if self.sender.send(notification).is_err() {
            tracing::trace!(?topic, "no subscriber, notification dropped");
        }
    }
}

/// Receiver that skips notifications outside its topic.
pub struct TopicSubscription {
    topic: NotificationTopic,
    receiver: broadcast::Receiver<Notification>,
}

impl TopicSubscription {
    /// Wait for the next notification of this topic.
    ///
    /// # Errors
    ///
    /// Same as [`broadcast::Receiver::recv`]: the subscriber lagged or the
    /// bus was dropped.
    pub async fn recv(&mut self) -> Result<Notification, RecvError> {
        loop {
            let notification = self.receiver.recv().await?;
            if notification.kind.topic() == self.topic {
                return Ok(notification);
            }
        }
    }

    /// Next buffered notification of this topic, without waiting.
    ///
    /// # Errors
    ///
    /// [`TryRecvError::Empty`] once nothing of this topic is buffered.
    pub fn try_recv(&mut self) -> Result<Notification, TryRecvError> {
        loop {
            let notification = self.receiver.try_recv()?;
            if notification.kind.topic() == self.topic {
                return Ok(notification);
            }
        }
    }
}
