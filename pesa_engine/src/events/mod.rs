//! Engine event hooks.
//!
//! Register callbacks on [`EventHooks`], turn them into running [`EventHandlers`], and give the resulting
//! [`EventProducers`] to whoever publishes. [`EventNotifier`] adapts the notification hook to the
//! [`crate::traits::NotificationChannel`] contract used by the payment flows.
mod channel;
mod event_types;
mod hooks;
mod notifier;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::NotificationEvent;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
pub use notifier::EventNotifier;
