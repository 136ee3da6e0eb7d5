//! The central dispatcher, its re-emit funnel, and the lifecycle controller
//! that drives RUNNING -> DRAINING -> DEAD.

pub mod dispatcher;
pub mod error;
pub mod funnel;
pub mod lifecycle;

pub use dispatcher::{Dispatcher, IDLE_SLEEP};
pub use error::{DispatcherError, Result};
pub use funnel::run_funnel_loop;
pub use lifecycle::{LifecycleController, LifecycleState};
