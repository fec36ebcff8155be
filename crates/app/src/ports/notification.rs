//! Notification port — publish/subscribe for UI-facing notifications.

use autotune_domain::notification::Notification;

/// Publishes notifications to interested subscribers.
///
/// Publishing is fire-and-forget: the call must hand the notification off
/// without blocking and never waits for subscribers. Delivery failures are
/// the publisher's business and are not reported back.
pub trait NotificationPublisher: Send + Sync {
    /// Publish a notification to all current subscribers.
    fn publish(&self, notification: Notification);
}

impl<T: NotificationPublisher> NotificationPublisher for std::sync::Arc<T> {
    fn publish(&self, notification: Notification) {
        (**self).publish(notification);
    }
}
