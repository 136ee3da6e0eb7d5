//! The module base contract: `Producer`/`Transformer`/`Sink` traits, their
//! default main loops, the dispatcher-side `WorkerHandle`, and the
//! three-partition module `Registry`.

pub mod args;
pub mod error;
pub mod handle;
pub mod module;
pub mod registry;

pub use error::{Result, WorkerError};
pub use handle::WorkerHandle;
pub use module::{
    run_sink_loop, run_transformer_loop, Producer, Sink, Transformer, WorkerContext,
    HANDLER_LOOP_SLEEP,
};
pub use registry::{Registry, FUNNEL_NAME};
