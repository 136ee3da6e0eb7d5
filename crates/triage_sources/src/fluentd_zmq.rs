//! Subscribes to a Fluentd-over-ZMQ forward stream, msgpack-decodes each
//! `[tag, time, record]` entry, and emits a `FluentdRecord` per record.
//! Mirrors `FluentdZMQInputEndpointModule`.

use std::sync::atomic::AtomicBool;

use serde::Deserialize;

use triage_protocol::Payload;
use triage_worker::{Producer, WorkerContext};

pub struct FluentdZmqSource {
    fluent_zmq_key: String,
    host: String,
    port: u16,
    protocol: String,
}

impl FluentdZmqSource {
    pub fn new(fluent_zmq_key: impl Into<String>, host: impl Into<String>, port: u16, protocol: impl Into<String>) -> Self {
        FluentdZmqSource {
            fluent_zmq_key: fluent_zmq_key.into(),
            host: host.into(),
            port,
            protocol: protocol.into(),
        }
    }
}

#[derive(Deserialize)]
struct ForwardEntry(String, i64, serde_json::Value);

impl Producer for FluentdZmqSource {
    fn run(&mut self, ctx: &WorkerContext, time_to_die: &AtomicBool) -> anyhow::Result<()> {
        let context = zmq::Context::new();
        let subscriber = context.socket(zmq::SUB)?;
        subscriber.connect(&format!("{}://{}:{}", self.protocol, self.host, self.port))?;
        subscriber.set_subscribe(self.fluent_zmq_key.as_bytes())?;

        while ctx.still_running(time_to_die) {
            if subscriber.poll(zmq::POLLIN, 500)? == 0 {
                continue;
            }
            let data_raw = subscriber.recv_bytes(0)?;
            let Some(split_at) = data_raw.iter().position(|&b| b == b' ') else {
                tracing::warn!(target: "triage_sources", "malformed frame, missing key separator");
                continue;
            };
            let data_recvd = &data_raw[split_at + 1..];
            let entries: Vec<ForwardEntry> = match rmp_serde::from_slice(data_recvd) {
                Ok(e) => e,
                Err(e) => {
                    tracing::error!(target: "triage_sources", error = %e, "msgpack decode failed");
                    continue;
                }
            };
            for ForwardEntry(_tag, _time, record) in entries {
                tracing::debug!(target: "triage_sources", "emitting fluentd zmq record");
                let record_type = record
                    .get("type")
                    .and_then(serde_json::Value::as_str)
                    .map(str::to_string);
                ctx.emit(Payload::FluentdRecord {
                    data: record,
                    record_type,
                })?;
            }
        }
        Ok(())
    }
}
