//! Logs every LogEntry/DeathLog it receives at a configured level. Mirrors
//! `LogOutputEndpointModule`.

use triage_protocol::{Kind, Object};
use triage_worker::Sink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

impl LogLevel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DEBUG" => Some(LogLevel::Debug),
            "INFO" => Some(LogLevel::Info),
            "WARN" => Some(LogLevel::Warn),
            "ERROR" => Some(LogLevel::Error),
            "CRITICAL" => Some(LogLevel::Critical),
            _ => None,
        }
    }
}

pub struct LogSink {
    level: LogLevel,
}

impl LogSink {
    pub fn new(level: LogLevel) -> Self {
        LogSink { level }
    }
}

impl Sink for LogSink {
    fn accepts(&self, kind: Kind) -> bool {
        matches!(kind, Kind::LogEntry | Kind::DeathLog)
    }

    fn handle(&mut self, input: &Object) {
        match self.level {
            LogLevel::Debug => tracing::debug!(target: "triage_sinks", %input),
            LogLevel::Info => tracing::info!(target: "triage_sinks", %input),
            LogLevel::Warn => tracing::warn!(target: "triage_sinks", %input),
            LogLevel::Error => tracing::error!(target: "triage_sinks", %input),
            LogLevel::Critical => tracing::error!(target: "triage_sinks", critical = true, %input),
        }
    }
}
