use crate::db_types::Notification;

/// A notification addressed to one user, as it travels through the event hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub user_id: String,
    pub notification: Notification,
}

impl NotificationEvent {
    pub fn new<S: Into<String>>(user_id: S, notification: Notification) -> Self {
        Self { user_id: user_id.into(), notification }
    }
}
