//! The central single-threaded routing loop (§4.3).

use std::time::Duration;

use triage_worker::WorkerHandle;

/// Sleep between tight inner loops once an iteration reports no work. Tunable.
pub const IDLE_SLEEP: Duration = Duration::from_millis(100);

pub struct Dispatcher {
    pub funnel: WorkerHandle,
    pub producers: Vec<WorkerHandle>,
    pub transformers: Vec<WorkerHandle>,
    pub sinks: Vec<WorkerHandle>,
}

impl Dispatcher {
    /// One iteration: producer sweep, then transformer output sweep.
    /// Returns whether any object was handled.
    pub fn processing_iteration(&self) -> bool {
        let mut any_handled = false;

        for handle in self.producers.iter().chain(std::iter::once(&self.funnel)) {
            let Ok(Some(obj)) = handle.from_worker.try_recv() else {
                continue;
            };
            any_handled = true;

            if obj.is_expired() {
                let death = obj.into_death_log();
                tracing::debug!(target: "triage_dispatcher", %death, "ttl exhausted");
                let _ = self.funnel.to_worker.send(death);
                continue;
            }

            let mut handled = false;
            for consumer in self.transformers.iter().chain(self.sinks.iter()) {
                if consumer.accepts(obj.kind()) {
                    handled = true;
                    if let Err(e) = consumer.to_worker.send(obj.clone()) {
                        tracing::warn!(
                            target: "triage_dispatcher",
                            worker = %consumer.name,
                            error = %e,
                            "fan-out send failed",
                        );
                    }
                }
            }

            if !handled {
                tracing::debug!(target: "triage_dispatcher", %obj, "no handler for object");
                let death = obj.into_death_log();
                let _ = self.funnel.to_worker.send(death);
            }
        }

        for transformer in &self.transformers {
            if let Ok(Some(obj)) = transformer.from_worker.try_recv() {
                any_handled = true;
                let _ = self.funnel.to_worker.send(obj);
            }
        }

        any_handled
    }

    /// All non-funnel workers, in no particular liveness order.
    pub fn non_funnel_handles(&self) -> impl Iterator<Item = &WorkerHandle> {
        self.producers
            .iter()
            .chain(self.transformers.iter())
            .chain(self.sinks.iter())
    }
}
