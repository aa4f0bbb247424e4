use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, NotificationEvent};

/// Producers for every hook that has a handler registered. Cheap to clone and hand to the flow APIs.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub notification_producers: Vec<EventProducer<NotificationEvent>>,
}

impl EventProducers {
    pub fn is_empty(&self) -> bool {
        self.notification_producers.is_empty()
    }
}

pub struct EventHandlers {
    pub on_notification: Option<EventHandler<NotificationEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_notification = hooks.on_notification.map(|f| EventHandler::new(buffer_size, f));
        Self { on_notification }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_notification {
            result.notification_producers.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task for each registered handler. The tasks end once all producers have been dropped.
    pub fn start_handlers(self) {
        if let Some(handler) = self.on_notification {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_notification: Option<Handler<NotificationEvent>>,
}

impl EventHooks {
    pub fn on_notification<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(NotificationEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_notification = Some(Arc::new(f));
        self
    }
}
