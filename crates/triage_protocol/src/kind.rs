//! The closed, tagged `Kind` enum and its per-kind `Payload`.
//!
//! Dispatch never matches exhaustively on `Kind`; modules declare the set of
//! kinds they accept and the dispatcher does set membership, so adding a
//! variant here never requires touching the dispatcher.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    LogEntry,
    DeathLog,
    JsonRecord,
    FluentdRecord,
    UrlRef,
    BinaryBlob,
    DownloadedBlob,
}

/// Every variant, for callers (module construction) that need to probe a
/// `accepts()` implementation to derive the set of kinds it declared.
pub const ALL_KINDS: [Kind; 7] = [
    Kind::LogEntry,
    Kind::DeathLog,
    Kind::JsonRecord,
    Kind::FluentdRecord,
    Kind::UrlRef,
    Kind::BinaryBlob,
    Kind::DownloadedBlob,
];

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::LogEntry => "LogEntry",
            Kind::DeathLog => "DeathLog",
            Kind::JsonRecord => "JsonRecord",
            Kind::FluentdRecord => "FluentdRecord",
            Kind::UrlRef => "UrlRef",
            Kind::BinaryBlob => "BinaryBlob",
            Kind::DownloadedBlob => "DownloadedBlob",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    LogEntry { log_data: String },
    DeathLog { log_data: String },
    JsonRecord { data: serde_json::Value },
    FluentdRecord { data: serde_json::Value, record_type: Option<String> },
    UrlRef { url: String },
    BinaryBlob { content: Vec<u8> },
    DownloadedBlob {
        url: String,
        user_agents: Vec<String>,
        content: Vec<u8>,
        hashdig: String,
        filetype: String,
    },
}

impl Payload {
    pub fn kind(&self) -> Kind {
        match self {
            Payload::LogEntry { .. } => Kind::LogEntry,
            Payload::DeathLog { .. } => Kind::DeathLog,
            Payload::JsonRecord { .. } => Kind::JsonRecord,
            Payload::FluentdRecord { .. } => Kind::FluentdRecord,
            Payload::UrlRef { .. } => Kind::UrlRef,
            Payload::BinaryBlob { .. } => Kind::BinaryBlob,
            Payload::DownloadedBlob { .. } => Kind::DownloadedBlob,
        }
    }

    /// Human-readable content, used both for `Display` and for building
    /// the next object's `ancestors` string.
    pub fn content_str(&self) -> String {
        match self {
            Payload::LogEntry { log_data } => log_data.clone(),
            Payload::DeathLog { log_data } => log_data.clone(),
            Payload::JsonRecord { data } => {
                serde_json::to_string_pretty(data).unwrap_or_default()
            }
            Payload::FluentdRecord { data, .. } => {
                serde_json::to_string_pretty(data).unwrap_or_default()
            }
            Payload::UrlRef { url } => url.clone(),
            Payload::BinaryBlob { content } => head_as_str(content),
            Payload::DownloadedBlob {
                url,
                user_agents,
                hashdig,
                filetype,
                content,
            } => format!(
                "URL: {}\nUser-Agent(s): {}\nFiletype: {}\nSHA256 Hash: {}\nHead Content: {}",
                url,
                user_agents.join(", "),
                filetype,
                hashdig,
                head_as_str(content),
            ),
        }
    }
}

fn head_as_str(content: &[u8]) -> String {
    let head = &content[..content.len().min(1024)];
    String::from_utf8_lossy(head).into_owned()
}
