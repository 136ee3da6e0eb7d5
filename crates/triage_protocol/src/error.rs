//! Protocol-level error types: configuration and object-model failures.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("unknown module '{0}' in registry")]
    UnknownModule(String),

    #[error("malformed config: {0}")]
    MalformedConfig(String),

    #[error("template substitution: missing key '{0}'")]
    MissingTemplateKey(String),

    #[error("template arguments must come in KEY VAL pairs, got {0}")]
    OddTemplateArgCount(usize),

    #[error("invalid table name '{0}': must match [A-Za-z0-9_]+ and not start with a digit")]
    InvalidTableName(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
