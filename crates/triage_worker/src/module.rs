//! The module base contract (§4.1): every worker is constructed with a
//! `start_ttl`, a recv/send object queue pair, a command queue, and a
//! `proc_lock`, and runs one of three default main loops.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use triage_protocol::{Kind, Object, Payload};
use triage_queue::{Command, ObjectQueue, ProcLock};

/// How long a transformer/sink sleeps between drain passes over its
/// `recv_queue` once it finds nothing left to process. Tunable, not a contract.
pub const HANDLER_LOOP_SLEEP: Duration = Duration::from_millis(100);

/// Everything a worker needs to talk back to the dispatcher: the object
/// queues in both directions, the command channel, and the lock the
/// controller uses to detect quiescence. Generic callers only ever see this
/// through `Arc<dyn ObjectQueue<_>>` / `Arc<dyn ProcLock>`, so it is
/// oblivious to whether the binding is threads or processes.
pub struct WorkerContext {
    pub name: String,
    pub start_ttl: i64,
    /// worker -> dispatcher
    pub send_queue: Arc<dyn ObjectQueue<Object>>,
    /// dispatcher -> worker
    pub recv_queue: Arc<dyn ObjectQueue<Object>>,
    pub cmd_queue: Arc<dyn ObjectQueue<Command>>,
    pub proc_lock: Arc<dyn ProcLock>,
}

impl WorkerContext {
    /// Drain all pending commands and act on them. Call before anything that
    /// depends on `time_to_die`.
    pub fn handle_command_queue(&self, time_to_die: &AtomicBool) {
        while let Ok(Some(cmd)) = self.cmd_queue.try_recv() {
            match cmd {
                Command::Die => time_to_die.store(true, Ordering::SeqCst),
                Command::LogResources => {
                    tracing::info!(
                        target: "triage_worker",
                        worker = %self.name,
                        recv_empty = self.recv_queue.is_empty(),
                        send_empty = self.send_queue.is_empty(),
                        "resource snapshot",
                    );
                }
            }
        }
    }

    pub fn still_running(&self, time_to_die: &AtomicBool) -> bool {
        self.handle_command_queue(time_to_die);
        !time_to_die.load(Ordering::SeqCst)
    }

    /// Producers use `emit` to hand the dispatcher a freshly minted object:
    /// `ttl = start_ttl`, no ancestors.
    pub fn emit(&self, payload: Payload) -> triage_queue::Result<()> {
        let obj = Object::new(payload, self.start_ttl);
        tracing::debug!(target: "triage_worker", worker = %self.name, %obj, "emitting");
        self.send_queue.send(obj)
    }

    /// Transformers use `reemit` to hand the dispatcher a derived child of
    /// `parent`: `ttl = parent.ttl - 1`, ancestors set to the stringified parent.
    pub fn reemit(&self, child_payload: Payload, parent: &Object) -> triage_queue::Result<()> {
        let child = parent.reemit(child_payload);
        self.send_queue.send(child)
    }
}

/// A source: overrides its own I/O loop entirely and calls `ctx.emit`.
pub trait Producer: Send {
    fn run(&mut self, ctx: &WorkerContext, time_to_die: &AtomicBool) -> anyhow::Result<()>;
}

/// A re-emitter: declares which kinds it accepts and maps one input object
/// to zero or more child payloads. Per-object errors are swallowed here
/// (logged, empty output) so one bad object never crashes the worker.
pub trait Transformer: Send {
    fn accepts(&self, kind: Kind) -> bool;
    fn handle(&mut self, input: &Object) -> Vec<Payload>;
}

/// A terminal consumer: declares accepted kinds, never emits.
pub trait Sink: Send {
    fn accepts(&self, kind: Kind) -> bool;
    fn handle(&mut self, input: &Object);
}

/// Default transformer main loop (§4.1): while alive, hold `proc_lock` for
/// the whole drain of `recv_queue`, reemit every child, release, sleep.
pub fn run_transformer_loop(
    ctx: &WorkerContext,
    transformer: &mut dyn Transformer,
    time_to_die: &AtomicBool,
) {
    while ctx.still_running(time_to_die) {
        let _guard = ctx.proc_lock.acquire().expect("proc_lock poisoned");
        while !ctx.recv_queue.is_empty() {
            let Ok(Some(input)) = ctx.recv_queue.try_recv() else {
                break;
            };
            for child in transformer.handle(&input) {
                if let Err(e) = ctx.reemit(child, &input) {
                    tracing::warn!(target: "triage_worker", worker = %ctx.name, error = %e, "reemit failed");
                }
            }
        }
        drop(_guard);
        thread::sleep(HANDLER_LOOP_SLEEP);
    }
}

/// Default sink main loop (§4.1): same shape as the transformer loop but
/// `handle` returns nothing and nothing is ever sent back out.
pub fn run_sink_loop(ctx: &WorkerContext, sink: &mut dyn Sink, time_to_die: &AtomicBool) {
    while ctx.still_running(time_to_die) {
        let _guard = ctx.proc_lock.acquire().expect("proc_lock poisoned");
        while !ctx.recv_queue.is_empty() {
            let Ok(Some(input)) = ctx.recv_queue.try_recv() else {
                break;
            };
            sink.handle(&input);
        }
        drop(_guard);
        thread::sleep(HANDLER_LOOP_SLEEP);
    }
}
