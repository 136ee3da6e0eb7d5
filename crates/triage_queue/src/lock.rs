//! `ProcLock`: the sole synchronization primitive shared between a worker
//! and the lifecycle controller. Holding it blocks the worker from starting
//! a new object; the controller uses that to detect per-worker quiescence
//! without asking workers to introspect their own queues.

use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard};

pub trait ProcLock: Send + Sync {
    /// Block until the lock is free, then hold it until the returned guard drops.
    fn acquire(&self) -> Result<Box<dyn Send + '_>>;
}

/// In-process binding: a plain shared mutex. Acquiring it on the controller
/// side blocks exactly until the worker thread finishes its current object,
/// matching the source's use of `threading.Lock`.
#[derive(Clone, Default)]
pub struct ThreadProcLock {
    inner: Arc<Mutex<()>>,
}

impl ThreadProcLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcLock for ThreadProcLock {
    fn acquire(&self) -> Result<Box<dyn Send + '_>> {
        let guard: MutexGuard<'_, ()> = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(Box::new(guard))
    }
}

/// Cross-process binding: the lock lives in the worker's address space, so
/// the controller cannot take it directly. Instead the worker exposes a tiny
/// REP control channel (mirroring the REQ/REP pattern used elsewhere for
/// control-plane RPC); "ACQUIRE" blocks the worker's reply until it is
/// between objects, "RELEASE" lets it resume. The guard's `Drop` sends RELEASE.
pub struct ZmqProcLock {
    ctx: zmq::Context,
    endpoint: String,
}

impl ZmqProcLock {
    pub fn new(ctx: zmq::Context, endpoint: impl Into<String>) -> Self {
        ZmqProcLock {
            ctx,
            endpoint: endpoint.into(),
        }
    }
}

struct ZmqProcLockGuard {
    sock: zmq::Socket,
}

impl Drop for ZmqProcLockGuard {
    fn drop(&mut self) {
        let _ = self.sock.send("RELEASE", 0);
        let _ = self.sock.recv_msg(0);
    }
}

impl ProcLock for ZmqProcLock {
    fn acquire(&self) -> Result<Box<dyn Send + '_>> {
        let sock = self.ctx.socket(zmq::REQ)?;
        sock.connect(&self.endpoint)?;
        sock.send("ACQUIRE", 0)?;
        sock.recv_msg(0)?;
        Ok(Box::new(ZmqProcLockGuard { sock }))
    }
}

/// Worker-side loop for a `ZmqProcLock`'s REP endpoint: bind, then on every
/// iteration between objects, briefly poll for a pending ACQUIRE and hold
/// the reply open (simulating the held mutex) until RELEASE arrives.
pub struct ZmqProcLockServer {
    sock: zmq::Socket,
}

impl ZmqProcLockServer {
    pub fn bind(ctx: &zmq::Context, endpoint: &str) -> Result<Self> {
        let sock = ctx.socket(zmq::REP)?;
        sock.bind(endpoint)?;
        Ok(ZmqProcLockServer { sock })
    }

    /// Non-blocking check: if the controller is waiting to acquire, hold the
    /// worker here until RELEASE is sent. Call this between handling objects.
    pub fn yield_if_requested(&self) -> Result<()> {
        let mut msg = zmq::Message::new();
        match self.sock.recv(&mut msg, zmq::DONTWAIT) {
            Ok(_) if msg.as_str() == Some("ACQUIRE") => {
                self.sock.send("ACK", 0)?;
                loop {
                    let mut release = zmq::Message::new();
                    self.sock.recv(&mut release, 0)?;
                    if release.as_str() == Some("RELEASE") {
                        self.sock.send("ACK", 0)?;
                        break;
                    }
                }
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(zmq::Error::EAGAIN) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Adapts a `ZmqProcLockServer` to the `ProcLock` trait for use as a worker's
/// own `WorkerContext::proc_lock` under the process binding: `acquire()`
/// yields to any pending controller ACQUIRE before letting the worker's loop
/// proceed, so `run_transformer_loop`/`run_sink_loop` stay identical across
/// both bindings.
pub struct ZmqWorkerLock {
    server: ZmqProcLockServer,
}

impl ZmqWorkerLock {
    pub fn new(server: ZmqProcLockServer) -> Self {
        ZmqWorkerLock { server }
    }
}

impl ProcLock for ZmqWorkerLock {
    fn acquire(&self) -> Result<Box<dyn Send + '_>> {
        self.server.yield_if_requested()?;
        Ok(Box::new(()))
    }
}
