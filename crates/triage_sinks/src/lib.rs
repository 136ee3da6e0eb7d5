//! Built-in sinks: stdout log, local/S3 store, SQLite dedup, Logstash, SMTP-on-regex.

pub mod error;
pub mod local_store;
pub mod log_sink;
pub mod logstash;
pub mod s3_store;
pub mod smtp_regex;
pub mod sqlite_dedup;

pub use error::{Result, SinkError};
pub use local_store::LocalStoreSink;
pub use log_sink::{LogLevel, LogSink};
pub use logstash::LogstashSink;
pub use s3_store::S3StoreSink;
pub use smtp_regex::SmtpOnRegexSink;
pub use sqlite_dedup::SqliteDedupSink;

use triage_worker::args::{opt_str, require_str};
use triage_worker::Registry;

pub fn register_all(registry: &mut Registry) -> triage_worker::Result<()> {
    registry.register_sink(
        "Log",
        Box::new(|args| {
            let level_str = opt_str(args, "level", "INFO");
            let level = LogLevel::parse(level_str)
                .ok_or_else(|| anyhow::anyhow!("invalid logging level '{level_str}'"))?;
            Ok(Box::new(LogSink::new(level)))
        }),
    )?;

    registry.register_sink(
        "LocalStore",
        Box::new(|args| {
            let output_dir = require_str(args, "output_dir")?;
            Ok(Box::new(LocalStoreSink::new(output_dir)))
        }),
    )?;

    registry.register_sink(
        "S3Store",
        Box::new(|args| {
            let bucket = require_str(args, "s3_bucket")?;
            let region = args
                .get("region_name")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string);
            Ok(Box::new(S3StoreSink::new(bucket, region)?))
        }),
    )?;

    registry.register_sink(
        "SQLiteDedup",
        Box::new(|args| {
            let db_filename = require_str(args, "db_filename")?;
            let db_table = require_str(args, "db_table")?;
            Ok(Box::new(SqliteDedupSink::new(db_filename, db_table)?))
        }),
    )?;

    registry.register_sink(
        "Logstash",
        Box::new(|args| {
            let host = require_str(args, "host")?;
            let port = args
                .get("port")
                .and_then(serde_json::Value::as_u64)
                .ok_or_else(|| anyhow::anyhow!("missing required argument 'port'"))? as u16;
            let protocol = opt_str(args, "protocol", "tcp");
            if protocol == "udp" {
                Ok(Box::new(LogstashSink::udp(host, port)?))
            } else {
                Ok(Box::new(LogstashSink::tcp(host, port)?))
            }
        }),
    )?;

    registry.register_sink(
        "SMTPOnRegex",
        Box::new(|args| {
            let pattern = require_str(args, "pattern")?;
            let host = require_str(args, "host")?;
            let from = require_str(args, "from")?;
            let to = require_str(args, "to")?;
            let subject = opt_str(args, "subject", "triage alert");
            let credentials = match (args.get("username"), args.get("password")) {
                (Some(u), Some(p)) => Some((
                    u.as_str().unwrap_or_default().to_string(),
                    p.as_str().unwrap_or_default().to_string(),
                )),
                _ => None,
            };
            Ok(Box::new(SmtpOnRegexSink::new(
                pattern,
                host,
                from,
                to,
                subject,
                credentials,
            )?))
        }),
    )?;

    Ok(())
}
