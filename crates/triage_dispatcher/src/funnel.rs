//! The re-emit funnel (§4.2): a reserved, producer-shaped singleton. Its
//! `recv_queue` is the dispatcher's write target for re-injecting any
//! object back into the producer layer; its only job is to copy that queue
//! into its `send_queue` one object at a time, using a short timed get so it
//! stays responsive to DIE.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use triage_worker::WorkerContext;

/// Bounds how long the funnel blocks on an empty `recv_queue` before
/// re-checking `time_to_die`.
const FUNNEL_POLL_TIMEOUT: Duration = Duration::from_secs(1);

pub fn run_funnel_loop(ctx: &WorkerContext, time_to_die: &AtomicBool) {
    while ctx.still_running(time_to_die) {
        match ctx.recv_queue.recv_timeout(FUNNEL_POLL_TIMEOUT) {
            Ok(Some(obj)) => {
                tracing::debug!(target: "triage_dispatcher", %obj, "funnel re-emitting");
                if let Err(e) = ctx.send_queue.send(obj) {
                    tracing::warn!(target: "triage_dispatcher", error = %e, "funnel send failed");
                }
            }
            Ok(None) => continue,
            Err(e) => {
                tracing::error!(target: "triage_dispatcher", error = %e, "funnel recv failed");
                break;
            }
        }
    }
}
