//! `ObjectQueue`: the queue abstraction the dispatcher and every worker
//! communicate through, generic over the concurrency binding. The dispatcher
//! only ever sees this trait; it never learns whether a given worker is an
//! OS thread sharing memory or an OS process talking over ZeroMQ.

use crate::error::{QueueError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub trait ObjectQueue<T>: Send + Sync {
    fn send(&self, item: T) -> Result<()>;
    /// Non-blocking take. `Ok(None)` means empty right now.
    fn try_recv(&self) -> Result<Option<T>>;
    /// Blocking take bounded by `timeout`. Used by the funnel's responsive poll.
    fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>>;
    fn is_empty(&self) -> bool;
}

/// In-process binding backed by `crossbeam-channel`.
pub struct ThreadQueue<T> {
    tx: crossbeam_channel::Sender<T>,
    rx: crossbeam_channel::Receiver<T>,
}

impl<T> ThreadQueue<T> {
    pub fn unbounded() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        ThreadQueue { tx, rx }
    }
}

impl<T> Clone for ThreadQueue<T> {
    fn clone(&self) -> Self {
        ThreadQueue {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T: Send> ObjectQueue<T> for ThreadQueue<T> {
    fn send(&self, item: T) -> Result<()> {
        self.tx.send(item).map_err(|_| QueueError::Disconnected)
    }

    fn try_recv(&self) -> Result<Option<T>> {
        match self.rx.try_recv() {
            Ok(item) => Ok(Some(item)),
            Err(crossbeam_channel::TryRecvError::Empty) => Ok(None),
            Err(crossbeam_channel::TryRecvError::Disconnected) => Err(QueueError::Disconnected),
        }
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        match self.rx.recv_timeout(timeout) {
            Ok(item) => Ok(Some(item)),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => Ok(None),
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => Err(QueueError::Disconnected),
        }
    }

    fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

/// Cross-process binding: a pair of ZeroMQ PUSH/PULL sockets bound on
/// private `ipc://` endpoints, with objects framed as JSON messages. This is
/// one direction only (PUSH side sends, PULL side receives) mirroring the
/// source's single-direction `multiprocessing.Queue`; a worker's full duplex
/// link is two `ProcessQueue`s, one per direction.
pub struct ProcessQueue<T> {
    push: Option<zmq::Socket>,
    pull: Option<zmq::Socket>,
    _marker: std::marker::PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned> ProcessQueue<T> {
    /// Bind the PULL end (the receiving side owns the endpoint).
    pub fn bind_pull(ctx: &zmq::Context, endpoint: &str) -> Result<Self> {
        let sock = ctx.socket(zmq::PULL)?;
        sock.bind(endpoint)?;
        Ok(ProcessQueue {
            push: None,
            pull: Some(sock),
            _marker: std::marker::PhantomData,
        })
    }

    /// Connect the PUSH end to a peer's bound PULL endpoint.
    pub fn connect_push(ctx: &zmq::Context, endpoint: &str) -> Result<Self> {
        let sock = ctx.socket(zmq::PUSH)?;
        sock.connect(endpoint)?;
        Ok(ProcessQueue {
            push: Some(sock),
            pull: None,
            _marker: std::marker::PhantomData,
        })
    }
}

impl<T: Serialize + DeserializeOwned + Send> ObjectQueue<T> for ProcessQueue<T> {
    fn send(&self, item: T) -> Result<()> {
        let sock = self.push.as_ref().ok_or(QueueError::Disconnected)?;
        let bytes = serde_json::to_vec(&item)?;
        sock.send(bytes, 0)?;
        Ok(())
    }

    fn try_recv(&self) -> Result<Option<T>> {
        let sock = self.pull.as_ref().ok_or(QueueError::Disconnected)?;
        let mut msg = zmq::Message::new();
        match sock.recv(&mut msg, zmq::DONTWAIT) {
            Ok(_) => Ok(Some(serde_json::from_slice(&msg)?)),
            Err(zmq::Error::EAGAIN) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<Option<T>> {
        let sock = self.pull.as_ref().ok_or(QueueError::Disconnected)?;
        if sock.poll(zmq::POLLIN, timeout.as_millis() as i64)? == 0 {
            return Ok(None);
        }
        let mut msg = zmq::Message::new();
        sock.recv(&mut msg, 0)?;
        Ok(Some(serde_json::from_slice(&msg)?))
    }

    fn is_empty(&self) -> bool {
        match &self.pull {
            Some(sock) => sock.poll(zmq::POLLIN, 0).unwrap_or(0) == 0,
            None => true,
        }
    }
}

/// A unique private `ipc://` endpoint path for one worker's one direction.
pub fn ipc_endpoint(base_dir: &std::path::Path, worker_name: &str, suffix: &str) -> String {
    format!(
        "ipc://{}/{}-{}.sock",
        base_dir.display(),
        worker_name,
        suffix
    )
}
