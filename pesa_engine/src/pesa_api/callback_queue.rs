use log::*;
use pesa_gateway::CallbackPayload;
use tokio::sync::mpsc::{self, error::TrySendError};

pub const DEFAULT_CALLBACK_QUEUE_SIZE: usize = 1024;

/// Hands validated gateway callbacks from the HTTP receiver to the callback worker.
///
/// The receiver acknowledges the gateway before the callback is processed, so enqueueing never waits. If the queue is
/// full the callback is dropped; the pending sweeper will settle the payment by querying the gateway instead.
#[derive(Clone)]
pub struct CallbackQueue {
    sender: mpsc::Sender<CallbackPayload>,
}

impl CallbackQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<CallbackPayload>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    pub fn try_enqueue(&self, payload: CallbackPayload) -> bool {
        let id = payload.correlation_id.clone();
        match self.sender.try_send(payload) {
            Ok(()) => {
                trace!("🔄️📥️ Callback for [{id}] queued");
                true
            },
            Err(TrySendError::Full(_)) => {
                warn!("🔄️📥️ Callback queue is full. Dropping callback for [{id}]. The sweeper will pick it up.");
                false
            },
            Err(TrySendError::Closed(_)) => {
                error!("🔄️📥️ Callback worker is not running. Dropping callback for [{id}].");
                false
            },
        }
    }
}
