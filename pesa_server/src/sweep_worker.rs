use std::{sync::Arc, time::Duration};

use chrono::Duration as ChronoDuration;
use log::*;
use pesa_gateway::GatewayApi;
use tokio::task::JoinHandle;

use crate::routes::PaymentApi;

/// Starts the pending payment sweeper. Payments that have been pending for longer than `stale_after` are checked with
/// the gateway, so that payments whose callback went missing still settle when nobody is polling for them.
/// Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_sweep_worker(
    api: Arc<PaymentApi<GatewayApi>>,
    interval: Duration,
    stale_after: ChronoDuration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval.max(Duration::from_secs(1)));
        info!("🕰️ Pending payment sweeper started");
        loop {
            timer.tick().await;
            debug!("🕰️ Sweeping payments pending for more than {}s", stale_after.num_seconds());
            match api.resolve_stale_payments(stale_after).await {
                Ok(0) => trace!("🕰️ No stale payments were settled"),
                Ok(n) => info!("🕰️ {n} stale payments settled"),
                Err(e) => error!("🕰️ Error sweeping stale payments: {e}"),
            }
        }
    })
}
