//! `WorkerHandle`: the dispatcher-side view of a running worker (§3,
//! "Module handle"). The dispatcher never touches a module's own state; it
//! only sees queues, the command channel, the processing lock, liveness, and
//! (for transformers/sinks) the declared kind set used for fan-out.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use triage_protocol::{Kind, Object};
use triage_queue::{Command, ObjectQueue, ProcLock};

pub struct WorkerHandle {
    pub name: String,
    /// dispatcher -> worker
    pub to_worker: Arc<dyn ObjectQueue<Object>>,
    /// worker -> dispatcher
    pub from_worker: Arc<dyn ObjectQueue<Object>>,
    pub cmd_queue: Arc<dyn ObjectQueue<Command>>,
    pub proc_lock: Arc<dyn ProcLock>,
    /// `None` for producers and the funnel; `Some(set)` for transformers/sinks.
    pub declared_kinds: Option<HashSet<Kind>>,
    alive: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn new(
        name: impl Into<String>,
        to_worker: Arc<dyn ObjectQueue<Object>>,
        from_worker: Arc<dyn ObjectQueue<Object>>,
        cmd_queue: Arc<dyn ObjectQueue<Command>>,
        proc_lock: Arc<dyn ProcLock>,
        declared_kinds: Option<HashSet<Kind>>,
        join: JoinHandle<()>,
    ) -> Self {
        WorkerHandle {
            name: name.into(),
            to_worker,
            from_worker,
            cmd_queue,
            proc_lock,
            declared_kinds,
            alive: Arc::new(AtomicBool::new(true)),
            join: Some(join),
        }
    }

    pub fn accepts(&self, kind: Kind) -> bool {
        match &self.declared_kinds {
            Some(set) => set.contains(&kind),
            None => false,
        }
    }

    pub fn send_die(&self) -> triage_queue::Result<()> {
        self.cmd_queue.send(Command::Die)
    }

    pub fn is_alive(&self) -> bool {
        match &self.join {
            Some(j) => !j.is_finished(),
            None => self.alive.load(Ordering::SeqCst),
        }
    }

    pub fn join(&mut self) {
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
        self.alive.store(false, Ordering::SeqCst);
    }
}
