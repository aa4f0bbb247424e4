use std::sync::Arc;

use log::*;
use pesa_engine::{helpers::with_backoff, helpers::RetryPolicy, CallbackDisposition};
use pesa_gateway::{CallbackPayload, GatewayApi};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::routes::PaymentApi;

/// Starts the callback worker, which drains the queue the callback route fills. The worker stops once every
/// [`pesa_engine::CallbackQueue`] handle has been dropped. Do not await the returned JoinHandle before then.
pub fn start_callback_worker(
    api: Arc<PaymentApi<GatewayApi>>,
    mut receiver: mpsc::Receiver<CallbackPayload>,
    policy: RetryPolicy,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("🕰️ Callback worker started");
        while let Some(payload) = receiver.recv().await {
            let id = payload.correlation_id.clone();
            let label = format!("Processing callback for [{id}]");
            let result = with_backoff(&policy, &label, || api.process_callback(payload.clone())).await;
            match result {
                Ok(CallbackDisposition::Settled(payment)) => {
                    info!("🕰️ Callback settled payment [{id}] as {}", payment.status)
                },
                Ok(CallbackDisposition::AlreadyTerminal(status)) => {
                    debug!("🕰️ Duplicate callback for [{id}] ignored. The payment is already {status}")
                },
                Ok(CallbackDisposition::Undetermined(code)) => {
                    warn!("🕰️ Callback for [{id}] carried result code {code}, which we don't recognise. Left pending.")
                },
                Ok(CallbackDisposition::UnknownPayment) => debug!("🕰️ Callback for unknown payment [{id}] dropped"),
                Err(e) => error!("🕰️ Could not process the callback for [{id}]. The sweeper will retry it. {e}"),
            }
        }
        info!("🕰️ Callback queue closed. Callback worker stopping.");
    })
}
