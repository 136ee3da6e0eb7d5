//! The lifecycle controller (§4.4): RUNNING -> DRAINING -> DEAD.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use triage_worker::WorkerHandle;

use crate::dispatcher::{Dispatcher, IDLE_SLEEP};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Draining,
    Dead,
}

/// Drives the dispatcher through its phases. `shutdown_requested` is shared
/// with the process's signal handlers (SIGINT/SIGTERM) so an externally
/// requested shutdown and the "all producers died" condition both funnel
/// through the same drain path.
pub struct LifecycleController {
    dispatcher: Dispatcher,
    state: LifecycleState,
    shutdown_requested: Arc<AtomicBool>,
}

impl LifecycleController {
    pub fn new(dispatcher: Dispatcher, shutdown_requested: Arc<AtomicBool>) -> Self {
        LifecycleController {
            dispatcher,
            state: LifecycleState::Running,
            shutdown_requested,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Run until DEAD. Returns once every worker has been joined.
    pub fn run(&mut self) {
        while self.state == LifecycleState::Running {
            while self.dispatcher.processing_iteration() {}
            thread::sleep(IDLE_SLEEP);

            if self.shutdown_requested.load(Ordering::SeqCst) {
                tracing::info!(target: "triage_dispatcher", "explicit shutdown requested");
                self.broadcast_die(std::iter::once(&self.dispatcher.funnel).chain(
                    self.dispatcher.producers.iter(),
                ).chain(self.dispatcher.transformers.iter()).chain(self.dispatcher.sinks.iter()));
                self.state = LifecycleState::Draining;
                break;
            }

            if self.dispatcher.producers.iter().all(|p| !p.is_alive()) {
                tracing::debug!(target: "triage_dispatcher", "all producers dead");
                self.state = LifecycleState::Draining;
            }
        }

        self.drain();
        self.state = LifecycleState::Dead;
    }

    fn broadcast_die<'a>(&self, handles: impl Iterator<Item = &'a WorkerHandle>) {
        for h in handles {
            if let Err(e) = h.send_die() {
                tracing::warn!(target: "triage_dispatcher", worker = %h.name, error = %e, "DIE send failed");
            }
        }
    }

    fn drain(&mut self) {
        for p in &self.dispatcher.producers {
            let _ = p.send_die();
        }

        loop {
            let lockable: Vec<&WorkerHandle> = self
                .dispatcher
                .transformers
                .iter()
                .chain(self.dispatcher.sinks.iter())
                .chain(std::iter::once(&self.dispatcher.funnel))
                .filter(|h| h.is_alive())
                .collect();

            let guards: Vec<_> = lockable
                .iter()
                .filter_map(|h| h.proc_lock.acquire().ok())
                .collect();

            let all_empty = lockable
                .iter()
                .all(|h| h.to_worker.is_empty() && h.from_worker.is_empty());

            if all_empty {
                drop(guards);
                break;
            }

            drop(guards);
            self.dispatcher.processing_iteration();
            thread::sleep(IDLE_SLEEP);
        }

        let _ = self.dispatcher.funnel.send_die();
        for h in self
            .dispatcher
            .producers
            .iter()
            .chain(self.dispatcher.transformers.iter())
            .chain(self.dispatcher.sinks.iter())
        {
            let _ = h.send_die();
        }

        self.dispatcher.funnel.join();
        for h in self
            .dispatcher
            .producers
            .iter_mut()
            .chain(self.dispatcher.transformers.iter_mut())
            .chain(self.dispatcher.sinks.iter_mut())
        {
            h.join();
        }

        tracing::debug!(target: "triage_dispatcher", "framework has died gracefully");
    }
}
