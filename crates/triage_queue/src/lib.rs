//! Queue and lock abstractions shared by both concurrency bindings
//! (in-process threads and cross-process workers). The dispatcher and the
//! module base contract in `triage_worker` are generic over these traits and
//! never need to know which binding is in effect.

pub mod command;
pub mod error;
pub mod lock;
pub mod queue;

pub use command::Command;
pub use error::{QueueError, Result};
pub use lock::{ProcLock, ThreadProcLock, ZmqProcLock, ZmqProcLockServer, ZmqWorkerLock};
pub use queue::{ipc_endpoint, ObjectQueue, ProcessQueue, ThreadQueue};
