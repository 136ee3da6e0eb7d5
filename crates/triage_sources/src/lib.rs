//! Built-in producers: line emitter, Fluentd JSON file reader, Fluentd-over-ZMQ subscriber.

pub mod emit_lines;
pub mod error;
pub mod fluentd_json_file;
pub mod fluentd_zmq;

pub use emit_lines::EmitLinesSource;
pub use error::{Result, SourceError};
pub use fluentd_json_file::FluentdJsonFileSource;
pub use fluentd_zmq::FluentdZmqSource;

use triage_worker::args::{opt_str, require_str};
use triage_worker::Registry;

/// Register every built-in producer under its config-file name.
pub fn register_all(registry: &mut Registry) -> triage_worker::Result<()> {
    registry.register_producer(
        "EmitLines",
        Box::new(|args| {
            let text_block = require_str(args, "text_block")?;
            Ok(Box::new(EmitLinesSource::new(text_block)))
        }),
    )?;

    registry.register_producer(
        "FluentdJSONFile",
        Box::new(|args| {
            let filename = require_str(args, "filename")?;
            Ok(Box::new(FluentdJsonFileSource::new(filename)))
        }),
    )?;

    registry.register_producer(
        "FluentdZMQ",
        Box::new(|args| {
            let key = require_str(args, "fluent_zmq_key")?;
            let host = opt_str(args, "host", "127.0.0.1");
            let port = args
                .get("port")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(5556) as u16;
            let protocol = opt_str(args, "protocol", "tcp");
            Ok(Box::new(FluentdZmqSource::new(key, host, port, protocol)))
        }),
    )?;

    Ok(())
}
