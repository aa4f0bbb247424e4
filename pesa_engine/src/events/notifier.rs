use futures_util::future::join_all;
use log::*;

use crate::{
    db_types::Notification,
    events::{EventProducers, NotificationEvent},
    traits::{NotificationChannel, NotificationError},
};

/// A [`NotificationChannel`] that publishes onto the `on_notification` event hook.
#[derive(Clone, Default)]
pub struct EventNotifier {
    producers: EventProducers,
}

impl EventNotifier {
    pub fn new(producers: EventProducers) -> Self {
        Self { producers }
    }
}

impl NotificationChannel for EventNotifier {
    async fn push(&self, user_id: &str, notification: Notification) -> Result<(), NotificationError> {
        if self.producers.is_empty() {
            return Err(NotificationError::NoSubscribers);
        }
        let event = NotificationEvent::new(user_id, notification);
        let sends = self.producers.notification_producers.iter().map(|p| p.publish_event(event.clone()));
        let delivered = join_all(sends).await.into_iter().filter(|ok| *ok).count();
        trace!("📬️ Notification for {user_id} handed to {delivered} subscribers");
        if delivered == 0 {
            return Err(NotificationError::DeliveryFailed("no event handler accepted the notification".into()));
        }
        Ok(())
    }
}
