//! Heartbeat pump — periodic liveness probe with event-driven resets.
//!
//! One task owns both the timer and all availability mutation, so probe
//! ticks and stream-event liveness signals are serialized and can never
//! race over the timer handle.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use homelink_protocol::constants::HEARTBEAT_PERIOD;

use crate::availability::Availability;

/// Runs until cancelled. Probes immediately, then on a repeating
/// [`HEARTBEAT_PERIOD`] timer. A liveness message (sent by the stream pump
/// for every inbound event) marks the hub available and pushes the next
/// probe out a full period, so a chatty hub is never separately polled.
/// The timer is re-armed after every probe regardless of outcome: the
/// probe is the only path back to availability.
pub(crate) async fn heartbeat_pump<P, Fut>(
    mut probe: P,
    availability: Arc<Availability>,
    mut liveness_rx: mpsc::Receiver<()>,
    cancel: CancellationToken,
) where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    run_probe(&mut probe, &availability).await;

    let sleep = tokio::time::sleep(HEARTBEAT_PERIOD);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,

            () = &mut sleep => {
                run_probe(&mut probe, &availability).await;
                sleep.as_mut().reset(tokio::time::Instant::now() + HEARTBEAT_PERIOD);
            }

            Some(()) = liveness_rx.recv() => {
                availability.set_available(true, None);
                sleep.as_mut().reset(tokio::time::Instant::now() + HEARTBEAT_PERIOD);
            }
        }
    }
}

async fn run_probe<P, Fut>(probe: &mut P, availability: &Availability)
where
    P: FnMut() -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    match probe().await {
        Ok(()) => {
            trace!("heartbeat ok");
            availability.set_available(true, None);
        }
        Err(error) => {
            debug!(%error, "heartbeat failed");
            availability.set_available(false, Some(error));
        }
    }
}
