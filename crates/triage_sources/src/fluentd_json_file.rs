//! Reads a file of newline-delimited JSON and emits a `FluentdRecord` per
//! non-empty line. Mirrors `FluentdJSONFileInputEndpointModule`.

use std::fs;
use std::sync::atomic::AtomicBool;

use triage_protocol::Payload;
use triage_worker::{Producer, WorkerContext};

pub struct FluentdJsonFileSource {
    filename: String,
}

impl FluentdJsonFileSource {
    pub fn new(filename: impl Into<String>) -> Self {
        FluentdJsonFileSource {
            filename: filename.into(),
        }
    }
}

impl Producer for FluentdJsonFileSource {
    fn run(&mut self, ctx: &WorkerContext, _time_to_die: &AtomicBool) -> anyhow::Result<()> {
        let contents = fs::read_to_string(&self.filename)?;
        for line in contents.split('\n') {
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<serde_json::Value>(line) {
                Ok(data) => {
                    tracing::debug!(target: "triage_sources", line, "emitting fluentd record");
                    let record_type = data
                        .get("type")
                        .and_then(serde_json::Value::as_str)
                        .map(str::to_string);
                    ctx.emit(Payload::FluentdRecord { data, record_type })?;
                }
                Err(e) => {
                    tracing::error!(target: "triage_sources", line, error = %e, "malformed json line");
                }
            }
        }
        Ok(())
    }
}
