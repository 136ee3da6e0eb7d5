//! Shared object model and configuration types for the triage pipeline.
//!
//! This crate has no knowledge of queues, workers, or the dispatcher; it is
//! the vocabulary every other crate builds on.

pub mod config;
pub mod error;
pub mod kind;
pub mod object;

pub use config::{Binding, ModuleEntry, PipelineConfig, DEFAULT_START_TTL};
pub use error::{ProtocolError, Result};
pub use kind::{Kind, Payload, ALL_KINDS};
pub use object::Object;
