//! Wraps each line of a text block as a `LogEntry`. Mirrors the source's
//! `EmitLinesInputEndpointModule`: emits once, then the worker exits.

use std::sync::atomic::AtomicBool;

use triage_protocol::Payload;
use triage_worker::{Producer, WorkerContext};

pub struct EmitLinesSource {
    text_block: String,
}

impl EmitLinesSource {
    pub fn new(text_block: impl Into<String>) -> Self {
        EmitLinesSource {
            text_block: text_block.into(),
        }
    }
}

impl Producer for EmitLinesSource {
    fn run(&mut self, ctx: &WorkerContext, _time_to_die: &AtomicBool) -> anyhow::Result<()> {
        for line in self.text_block.split('\n') {
            ctx.emit(Payload::LogEntry {
                log_data: line.to_string(),
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_newlines() {
        let src = EmitLinesSource::new("a\nb\nc");
        assert_eq!(src.text_block.split('\n').count(), 3);
    }
}
