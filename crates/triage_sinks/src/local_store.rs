//! Writes each DownloadedBlob to `output_dir/<sha256>`, skipping an existing
//! file. Mirrors `LocalStoreDownloadedObject`.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use triage_protocol::{Kind, Object, Payload};
use triage_worker::Sink;

pub struct LocalStoreSink {
    output_dir: PathBuf,
}

impl LocalStoreSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        LocalStoreSink {
            output_dir: output_dir.into(),
        }
    }
}

impl Sink for LocalStoreSink {
    fn accepts(&self, kind: Kind) -> bool {
        matches!(kind, Kind::DownloadedBlob)
    }

    fn handle(&mut self, input: &Object) {
        let Payload::DownloadedBlob { hashdig, content, .. } = &input.payload else {
            return;
        };
        let output_file = self.output_dir.join(hashdig);
        match OpenOptions::new().write(true).create_new(true).open(&output_file) {
            Ok(mut f) => match f.write_all(content) {
                Ok(()) => tracing::debug!(target: "triage_sinks", path = %output_file.display(), "wrote file"),
                Err(e) => tracing::error!(target: "triage_sinks", path = %output_file.display(), error = %e, "write failed"),
            },
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                tracing::info!(target: "triage_sinks", path = %output_file.display(), "not outputting, already exists");
            }
            Err(e) => {
                tracing::error!(target: "triage_sinks", path = %output_file.display(), error = %e, "open failed");
            }
        }
    }
}
