use thiserror::Error;

use crate::db_types::Notification;

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Nobody is listening for notifications")]
    NoSubscribers,
    #[error("Could not deliver notification: {0}")]
    DeliveryFailed(String),
}

/// Pushes status updates to a connected client.
///
/// Delivery is best effort. Callers log failures and carry on.
#[allow(async_fn_in_trait)]
pub trait NotificationChannel {
    async fn push(&self, user_id: &str, notification: Notification) -> Result<(), NotificationError>;
}
