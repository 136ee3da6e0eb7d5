//! The cooperative cancellation / introspection command set.

use serde::{Deserialize, Serialize};

/// Sent dispatcher -> worker over a worker's dedicated command queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Flip the worker's `time_to_die` flag; it exits after its current object.
    Die,
    /// Log current queue depths and other resource counters.
    LogResources,
}
